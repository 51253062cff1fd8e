//! Line-based statement lowering for the metadata path.
//!
//! Accepted grammar, one statement per line:
//!
//! ```text
//! _field = operand;          assignment to a backing field
//! return [operand];
//! new Type(operand, ...);    object creation (result discarded)
//! if ... / for ... / foreach ...   placeholder branch, condition ignored
//! { and } on their own line  ignored
//! operand := param | _field | this._field | literal | new Type(...)
//! ```
//!
//! Anything else aborts the whole emission with `UnsupportedStatement`.

use rust_decimal::Decimal;

use crate::error::{Error, Result};
use crate::model::{BranchKind, Instruction, Literal, ParameterDefinition, seal};
use crate::schema::is_valid_identifier;

/// Lowers statement text for one member.
pub struct StatementLowering<'a> {
    member: &'a str,
    parameters: &'a [ParameterDefinition],
    line: usize,
    statement: String,
}

impl<'a> StatementLowering<'a> {
    pub fn new(member: &'a str, parameters: &'a [ParameterDefinition]) -> Self {
        Self {
            member,
            parameters,
            line: 0,
            statement: String::new(),
        }
    }

    /// Lower a whole body. The result always ends with `Return`.
    pub fn lower(mut self, body: &str) -> Result<Vec<Instruction>> {
        let mut out = Vec::new();

        for (index, raw) in body.lines().enumerate() {
            self.line = index + 1;
            self.statement = raw.trim().to_string();
            let line = raw.trim();

            if line.is_empty() || line.starts_with("//") {
                continue;
            }
            if line.chars().all(|c| matches!(c, '{' | '}' | ';' | ' ')) {
                continue;
            }
            if let Some(kind) = branch_keyword(line) {
                let target = (out.len() + 1) as u32;
                out.push(Instruction::Branch { kind, target });
                continue;
            }

            self.lower_statement(line, &mut out)?;
        }

        Ok(seal(out))
    }

    fn lower_statement(&self, line: &str, out: &mut Vec<Instruction>) -> Result<()> {
        let line = line.trim_start_matches('}').trim();
        let Some(stmt) = line.strip_suffix(';') else {
            return Err(self.unsupported("statement must end with `;`"));
        };
        let stmt = stmt.trim();

        if stmt == "return" {
            out.push(Instruction::Return);
            return Ok(());
        }
        if let Some(operand) = stmt.strip_prefix("return ") {
            self.lower_operand(operand.trim(), out)?;
            out.push(Instruction::Return);
            return Ok(());
        }
        if stmt.starts_with("new ") {
            self.lower_operand(stmt, out)?;
            out.push(Instruction::Pop);
            return Ok(());
        }
        if let Some((target, value)) = split_assignment(stmt) {
            let target = target.trim();
            let field = target.strip_prefix("this.").unwrap_or(target);
            if !field.starts_with('_') || !is_valid_identifier(field) {
                return Err(self.unsupported("assignment target must be a backing field"));
            }
            self.lower_operand(value.trim(), out)?;
            out.push(Instruction::StoreField(field.to_string()));
            return Ok(());
        }

        Err(self.unsupported("unrecognized statement"))
    }

    fn lower_operand(&self, operand: &str, out: &mut Vec<Instruction>) -> Result<()> {
        if let Some(creation) = operand.strip_prefix("new ") {
            return self.lower_creation(creation.trim(), out);
        }
        if let Some(literal) = parse_literal(operand) {
            out.push(Instruction::LoadConst(literal));
            return Ok(());
        }

        let name = operand.strip_prefix("this.").unwrap_or(operand);
        if !is_valid_identifier(name) {
            return Err(self.unsupported(&format!("unsupported operand `{operand}`")));
        }
        if let Some(index) = self.parameters.iter().position(|p| p.name == name) {
            out.push(Instruction::LoadArg(index as u16));
            return Ok(());
        }
        if name.starts_with('_') {
            out.push(Instruction::LoadField(name.to_string()));
            return Ok(());
        }

        Err(self.unsupported(&format!("unknown operand `{operand}`")))
    }

    fn lower_creation(&self, creation: &str, out: &mut Vec<Instruction>) -> Result<()> {
        let (type_name, rest) = creation
            .split_once('(')
            .ok_or_else(|| self.unsupported("object creation needs an argument list"))?;
        let type_name = type_name.trim();
        let args = rest
            .strip_suffix(')')
            .ok_or_else(|| self.unsupported("unterminated argument list"))?;
        if !is_valid_identifier(type_name) {
            return Err(self.unsupported(&format!("invalid type name `{type_name}`")));
        }

        let args = split_arguments(args)
            .ok_or_else(|| self.unsupported("unbalanced argument list"))?;
        for arg in &args {
            self.lower_operand(arg, out)?;
        }
        out.push(Instruction::NewObject {
            type_name: type_name.to_string(),
            arg_count: args.len() as u16,
        });
        Ok(())
    }

    fn unsupported(&self, reason: &str) -> Error {
        Error::UnsupportedStatement {
            member: self.member.to_string(),
            line: self.line,
            statement: self.statement.clone(),
            reason: reason.to_string(),
        }
    }
}

/// Lower `body` for `member`. Convenience over [`StatementLowering`].
pub fn lower_statements(
    member: &str,
    parameters: &[ParameterDefinition],
    body: &str,
) -> Result<Vec<Instruction>> {
    StatementLowering::new(member, parameters).lower(body)
}

fn branch_keyword(line: &str) -> Option<BranchKind> {
    let line = line.trim_start_matches('}').trim_start();
    for (keyword, kind) in [
        ("foreach", BranchKind::Foreach),
        ("for", BranchKind::For),
        ("if", BranchKind::If),
    ] {
        if let Some(rest) = line.strip_prefix(keyword)
            && (rest.starts_with(' ') || rest.starts_with('('))
        {
            return Some(kind);
        }
    }
    None
}

/// Split `a = b` (but not `a == b`) at the assignment operator.
fn split_assignment(stmt: &str) -> Option<(&str, &str)> {
    let index = stmt.find('=')?;
    let bytes = stmt.as_bytes();
    if bytes.get(index + 1) == Some(&b'=') {
        return None;
    }
    if index > 0 && matches!(bytes[index - 1], b'!' | b'<' | b'>' | b'+' | b'-' | b'*' | b'/') {
        return None;
    }
    Some((&stmt[..index], &stmt[index + 1..]))
}

/// Split a comma separated argument list at top level.
fn split_arguments(args: &str) -> Option<Vec<String>> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escaped = false;
    let mut current = String::new();

    for c in args.chars() {
        if in_string {
            current.push(c);
            match (escaped, c) {
                (true, _) => escaped = false,
                (false, '\\') => escaped = true,
                (false, '"') => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => {
                in_string = true;
                current.push(c);
            }
            '(' => {
                depth += 1;
                current.push(c);
            }
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return None;
                }
                current.push(c);
            }
            ',' if depth == 0 => {
                parts.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(c),
        }
    }

    if depth != 0 || in_string {
        return None;
    }
    let last = current.trim();
    if !last.is_empty() {
        parts.push(last.to_string());
    } else if !parts.is_empty() {
        return None;
    }
    Some(parts)
}

/// Parse a literal operand: strings, booleans, `null`, integers (`L` suffix
/// for 64-bit), floats and decimals (`m` suffix).
fn parse_literal(text: &str) -> Option<Literal> {
    match text {
        "true" => return Some(Literal::Bool(true)),
        "false" => return Some(Literal::Bool(false)),
        "null" => return Some(Literal::Null),
        _ => {}
    }

    if let Some(inner) = text.strip_prefix('"').and_then(|t| t.strip_suffix('"')) {
        return unescape(inner).map(Literal::String);
    }

    let first = text.chars().next()?;
    if !(first.is_ascii_digit() || first == '-') {
        return None;
    }
    if let Some(digits) = text.strip_suffix(['m', 'M']) {
        return digits.parse::<Decimal>().ok().map(Literal::Decimal);
    }
    if let Some(digits) = text.strip_suffix('L') {
        return digits.parse::<i64>().ok().map(Literal::Int64);
    }
    if text.contains('.') {
        return text.parse::<f64>().ok().map(Literal::Float64);
    }
    if let Ok(value) = text.parse::<i32>() {
        return Some(Literal::Int32(value));
    }
    text.parse::<i64>().ok().map(Literal::Int64)
}

fn unescape(inner: &str) -> Option<String> {
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next()? {
                'n' => out.push('\n'),
                't' => out.push('\t'),
                '\\' => out.push('\\'),
                '"' => out.push('"'),
                _ => return None,
            },
            '"' => return None,
            _ => out.push(c),
        }
    }
    Some(out)
}
