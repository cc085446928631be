/// §6.3's opcode catalog, split into the shapes `bsc_ir::stmt::IrStmt`
/// actually needs: a binary/inplace kind, a unary kind, and the `Test`
/// subcode. `LoadConst` through `Export` line up 1:1 with the opcode names
/// the bytecode emitter (`bsc_bytecode`) maps to single-byte opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOpKind {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Shl,
    Shr,
    And,
    Or,
    Xor,
}

/// §6.3 lists only `Neg`/`Not` for unary ops; `~` (bitwise complement) is a
/// third surface-level unary operator with no catalog entry of its own.
/// Folding it onto `Neg` would make `-x` and `~x` indistinguishable in the
/// emitted IR, so `BitNot` extends the catalog by analogy the same way
/// `bsc_bytecode::registers` extends the register-overflow story -- see
/// DESIGN.md.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOpKind {
    Neg,
    Not,
    BitNot,
}

/// §6.3's `IRTestKind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestKind {
    Less,
    LessOrEqual,
    Grater,
    GraterOrEqual,
    Equal,
    NotEqual,
    Instance,
    NotInstance,
    Contain,
    NotContain,
}

/// `MakeList`/`MakeMap`/`MakeClosure` share an "apply op to N operand
/// registers" shape; `MakeClosure` additionally carries the closure's
/// symbol (see `IrStmt::MakeClosure`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MakeKind {
    List,
    Map,
}

impl From<bsc_ast::BinaryOp> for BinaryOpKind {
    fn from(op: bsc_ast::BinaryOp) -> Self {
        use bsc_ast::BinaryOp::*;
        match op {
            Add => BinaryOpKind::Add,
            Sub => BinaryOpKind::Sub,
            Mul => BinaryOpKind::Mul,
            Div => BinaryOpKind::Div,
            Mod => BinaryOpKind::Mod,
            Shl => BinaryOpKind::Shl,
            Shr => BinaryOpKind::Shr,
            BitAnd => BinaryOpKind::And,
            BitOr => BinaryOpKind::Or,
            BitXor => BinaryOpKind::Xor,
            Less | LessOrEqual | Grater | GraterOrEqual | Equal | NotEqual => {
                unreachable!("relational/equality BinaryOp is lowered via TestKind, not BinaryOpKind")
            }
        }
    }
}

impl From<bsc_ast::BinaryOp> for TestKind {
    fn from(op: bsc_ast::BinaryOp) -> Self {
        use bsc_ast::BinaryOp::*;
        match op {
            Less => TestKind::Less,
            LessOrEqual => TestKind::LessOrEqual,
            Grater => TestKind::Grater,
            GraterOrEqual => TestKind::GraterOrEqual,
            Equal => TestKind::Equal,
            NotEqual => TestKind::NotEqual,
            _ => unreachable!("non-relational BinaryOp is lowered via BinaryOpKind, not TestKind"),
        }
    }
}

impl From<bsc_ast::AssignOp> for BinaryOpKind {
    fn from(op: bsc_ast::AssignOp) -> Self {
        use bsc_ast::AssignOp::*;
        match op {
            Add => BinaryOpKind::Add,
            Sub => BinaryOpKind::Sub,
            Mul => BinaryOpKind::Mul,
            Div => BinaryOpKind::Div,
            Mod => BinaryOpKind::Mod,
            BitAnd => BinaryOpKind::And,
            BitOr => BinaryOpKind::Or,
            BitXor => BinaryOpKind::Xor,
            LeftShift => BinaryOpKind::Shl,
            RightShift => BinaryOpKind::Shr,
            Assign => unreachable!("plain `=` is not an inplace op"),
        }
    }
}
