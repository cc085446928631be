use rustc_hash::FxHashMap;

use bsc_errors::{ErrorCode, Handler};
use bsc_ir::{IrValue, IR_INVALID_VALUE};
use bsc_span::SourcePosition;

/// `bsc_ir::IrValue` is a 32-bit register id allocated once per *function*
/// by `IRBuilder`'s monotonic counter (§4.5.1); the bytecode record formats
/// (§6.4) spend a single byte on a register operand. This renumbers every
/// distinct value used by a function into a dense, first-appearance-order
/// `u8` index -- exactly the "register allocation" a real bytecode backend
/// would run, just with the identity mapping SSA already gives for free
/// (one IR value, one slot) rather than any liveness-based reuse.
///
/// A function using more than 256 distinct values overflows a byte slot;
/// that is reported the same way label-patch overflow is (§4.6): an error
/// through the handler, with emission continuing and the index wrapped
/// rather than the writer aborting.
#[derive(Default)]
pub struct RegisterAlloc {
    slots: FxHashMap<IrValue, u8>,
    next: u32,
    overflowed: bool,
}

/// Sentinel register byte meaning "no value" (e.g. a bare `return`'s
/// operand, `Assert`'s omitted message). Register 0xFF is otherwise a
/// legitimate slot only once a function has allocated 255 others, at which
/// point the function has already overflowed and reported an error.
pub const NO_REGISTER: u8 = 0xFF;

impl RegisterAlloc {
    pub fn new() -> Self {
        RegisterAlloc::default()
    }

    pub fn slot(&mut self, value: IrValue, pos: SourcePosition, handler: &Handler) -> u8 {
        if value == IR_INVALID_VALUE {
            return NO_REGISTER;
        }
        if let Some(&b) = self.slots.get(&value) {
            return b;
        }
        let index = self.next;
        self.next += 1;
        if index >= 0xFF && !self.overflowed {
            self.overflowed = true;
            handler.error(ErrorCode::TooManyRegisters, pos, "function uses more than 255 distinct registers; bytecode register operands are one byte wide");
        }
        let byte = (index % 0xFF) as u8;
        self.slots.insert(value, byte);
        byte
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bsc_errors::Handler;

    #[test]
    fn same_value_reuses_its_slot() {
        let handler = Handler::new(false);
        let mut regs = RegisterAlloc::new();
        let a = regs.slot(IrValue(3), SourcePosition::synthetic(), &handler);
        let b = regs.slot(IrValue(7), SourcePosition::synthetic(), &handler);
        let c = regs.slot(IrValue(3), SourcePosition::synthetic(), &handler);
        assert_eq!(a, c);
        assert_ne!(a, b);
        assert!(!handler.has_errors());
    }

    #[test]
    fn invalid_value_is_the_no_register_sentinel() {
        let handler = Handler::new(false);
        let mut regs = RegisterAlloc::new();
        assert_eq!(regs.slot(IR_INVALID_VALUE, SourcePosition::synthetic(), &handler), NO_REGISTER);
    }

    #[test]
    fn overflowing_255_registers_reports_once() {
        let handler = Handler::new(false);
        let mut regs = RegisterAlloc::new();
        for i in 0..300u32 {
            regs.slot(IrValue(i), SourcePosition::synthetic(), &handler);
        }
        assert_eq!(handler.error_count(), 1);
    }
}
