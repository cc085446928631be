use bsc_errors::{ErrorCode, Handler};
use bsc_ir::{BlockId, IrValue, Value};
use bsc_span::SourcePosition;

use crate::label::{Label, LabelRef};
use crate::opcode::{OpCode, TestKindByte};
use crate::pool::Pool;
use crate::registers::RegisterAlloc;

/// Emits one function's bytecode (§4.6). `RegisterLabel`/`GetLabel`/
/// `EndLabel` are the block count's worth of `Label`s in `labels`, indexed
/// by `BlockId` (finalized `IrCodeBlock`s number blocks densely from 0, see
/// `bsc_ir::builder::finalize`); `pending` accumulates every `LabelRef`
/// written so far for `patch_pending` to resolve once every block has been
/// emitted and every `Label.begin` is known.
pub struct BytecodeWriter<'h> {
    buffer: Vec<u8>,
    consts: Pool<Value>,
    strings: Pool<String>,
    labels: Vec<Label>,
    pending: Vec<LabelRef>,
    line_table: Vec<(u32, u32, u32)>,
    registers: RegisterAlloc,
    handler: &'h Handler,
}

/// The flat result of `BytecodeWriter::finish`: a byte buffer plus the
/// metadata (§4.6/§6.5) needed to interpret it -- constant pool, string
/// pool (member names and mangled symbol names, interned together since
/// both are plain strings read by name at the object-model boundary this
/// document stops short of), and the line-info stream.
pub struct CompiledCode {
    pub code: Vec<u8>,
    pub consts: Vec<Value>,
    pub strings: Vec<String>,
    pub line_info: Vec<(u32, u32, u32)>,
}

impl<'h> BytecodeWriter<'h> {
    pub fn new(block_count: usize, handler: &'h Handler) -> Self {
        BytecodeWriter {
            buffer: Vec::new(),
            consts: Pool::new(),
            strings: Pool::new(),
            labels: vec![Label::default(); block_count],
            pending: Vec::new(),
            line_table: Vec::new(),
            registers: RegisterAlloc::new(),
            handler,
        }
    }

    pub fn offset(&self) -> u32 {
        self.buffer.len() as u32
    }

    /// `RegisterLabel`: marks the current byte offset as `block`'s `Begin`.
    pub fn register_label(&mut self, block: BlockId) {
        self.labels[block.0 as usize].begin = Some(self.offset());
    }

    /// `EndLabel`: records the last byte belonging to `block` (needed for
    /// exception ranges, §3.7's `ExceptInfo`).
    pub fn end_label(&mut self, block: BlockId) {
        self.labels[block.0 as usize].end = Some(self.offset());
    }

    /// `GetLabel`, idempotent: safe to call before or after the referenced
    /// block has been emitted.
    pub fn label(&self, block: BlockId) -> Label {
        self.labels[block.0 as usize]
    }

    pub fn intern_const(&mut self, value: Value) -> u16 {
        self.consts.intern(value)
    }

    pub fn intern_string(&mut self, s: impl Into<String>) -> u16 {
        self.strings.intern(s.into())
    }

    /// Appends `(pos, byte_offset)` to the line table unless `pos` is
    /// synthetic (§4.6: "positions with line=0 are never appended, so
    /// synthetic IR carries no debug entries"). Call this once per emitted
    /// instruction, before its opcode byte.
    fn record_line(&mut self, pos: SourcePosition) {
        if !pos.is_synthetic() {
            self.line_table.push((self.offset(), pos.line, pos.column));
        }
    }

    pub fn op(&mut self, pos: SourcePosition, op: OpCode) {
        self.record_line(pos);
        self.buffer.push(op.byte());
    }

    pub fn testkind(&mut self, kind: TestKindByte) {
        self.buffer.push(kind.byte());
    }

    /// Writes a register operand. `IR_INVALID_VALUE` is encoded as the
    /// `NO_REGISTER` sentinel rather than consuming a slot (§3.6's
    /// `IRInvalidValue`: "no value / void").
    pub fn reg(&mut self, pos: SourcePosition, value: IrValue) {
        let byte = self.registers.slot(value, pos, self.handler);
        self.buffer.push(byte);
    }

    pub fn u16(&mut self, v: u16) {
        self.buffer.extend_from_slice(&v.to_le_bytes());
    }

    pub fn u32(&mut self, v: u32) {
        self.buffer.extend_from_slice(&v.to_le_bytes());
    }

    /// `Br`'s absolute target: a `u32` patched at `finish` time to
    /// `label.Begin`.
    pub fn branch_absolute(&mut self, block: BlockId) {
        let position = self.offset();
        self.pending.push(LabelRef { block: block.0, absolute: true, position });
        self.u32(0);
    }

    /// `BrCond`'s pc-relative target: an `i16` patched to
    /// `label.Begin - position` (§4.6), where `position` is the offset of
    /// the field itself.
    pub fn branch_relative(&mut self, block: BlockId) {
        let position = self.offset();
        self.pending.push(LabelRef { block: block.0, absolute: false, position });
        self.buffer.extend_from_slice(&0i16.to_le_bytes());
    }

    /// Patches every recorded `LabelRef` now that all blocks have been
    /// emitted and every `Label.begin` is known (§4.6's `Build()`).
    /// Out-of-range relative offsets are reported but do not abort
    /// emission -- the buffer is returned as-is, exactly as the design
    /// calls for.
    fn patch_pending(&mut self) {
        let pending = std::mem::take(&mut self.pending);
        for r in pending {
            let label = self.labels[r.block as usize];
            let target = label.begin();
            if r.absolute {
                self.buffer[r.position as usize..r.position as usize + 4].copy_from_slice(&target.to_le_bytes());
            } else {
                let diff = target as i64 - r.position as i64;
                match i16::try_from(diff) {
                    Ok(v) => self.buffer[r.position as usize..r.position as usize + 2].copy_from_slice(&v.to_le_bytes()),
                    Err(_) => {
                        self.handler.error(ErrorCode::BranchOffsetOutOfRange, SourcePosition::synthetic(), format!("branch offset {} does not fit in 16 bits", diff));
                        self.buffer[r.position as usize..r.position as usize + 2].copy_from_slice(&(diff as i16).to_le_bytes());
                    }
                }
            }
        }
    }

    /// `Build()`: resolves every forward reference, then hands back the
    /// buffer and its metadata.
    pub fn finish(mut self) -> CompiledCode {
        self.patch_pending();
        CompiledCode { code: self.buffer, consts: self.consts.entries().to_vec(), strings: self.strings.entries().to_vec(), line_info: self.line_table }
    }
}
