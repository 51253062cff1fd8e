//! Instruction set for accessor and method bodies.
//!
//! A deliberately small stack machine: enough for accessors that load and
//! store backing fields, return values and create objects. Branches are
//! placeholders that jump to the next instruction.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::types::Literal;

/// Kind of control-flow statement a placeholder branch stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BranchKind {
    If,
    For,
    Foreach,
}

impl BranchKind {
    pub fn keyword(self) -> &'static str {
        match self {
            Self::If => "if",
            Self::For => "for",
            Self::Foreach => "foreach",
        }
    }
}

/// A single instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Instruction {
    /// Push the argument at `index` (0 is the first declared parameter).
    LoadArg(u16),
    /// Push the value of a field of the receiver.
    LoadField(String),
    /// Pop a value into a field of the receiver.
    StoreField(String),
    /// Push a constant.
    LoadConst(Literal),
    /// Pop `arg_count` values and push a new instance of `type_name`.
    NewObject { type_name: String, arg_count: u16 },
    /// Discard the top of the stack.
    Pop,
    /// Unconditional jump standing in for a control-flow statement.
    Branch { kind: BranchKind, target: u32 },
    /// Return the top of the stack, or nothing when the stack is empty.
    Return,
}

impl Instruction {
    /// Field name read or written by this instruction.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::LoadField(name) | Self::StoreField(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LoadArg(index) => write!(f, "ldarg {index}"),
            Self::LoadField(name) => write!(f, "ldfld {name}"),
            Self::StoreField(name) => write!(f, "stfld {name}"),
            Self::LoadConst(literal) => write!(f, "ldc {literal:?}"),
            Self::NewObject {
                type_name,
                arg_count,
            } => write!(f, "newobj {type_name}/{arg_count}"),
            Self::Pop => f.write_str("pop"),
            Self::Branch { kind, target } => write!(f, "br.{} {target}", kind.keyword()),
            Self::Return => f.write_str("ret"),
        }
    }
}

/// Append a trailing `Return` unless the body already ends with one.
pub fn seal(mut body: Vec<Instruction>) -> Vec<Instruction> {
    if body.last() != Some(&Instruction::Return) {
        body.push(Instruction::Return);
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seal_appends_return_once() {
        let body = seal(vec![Instruction::LoadArg(0), Instruction::StoreField("_Id".into())]);
        assert_eq!(body.last(), Some(&Instruction::Return));
        assert_eq!(seal(body.clone()), body);
    }

    #[test]
    fn test_display() {
        assert_eq!(Instruction::LoadField("_Name".into()).to_string(), "ldfld _Name");
        assert_eq!(
            Instruction::Branch {
                kind: BranchKind::Foreach,
                target: 3
            }
            .to_string(),
            "br.foreach 3"
        );
    }
}
