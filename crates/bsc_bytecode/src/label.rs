/// A block's position in the byte buffer, filled in as emission reaches it
/// (§4.6's two-pass `Label`/`LabelRef` model: register now, patch at
/// `Build()`). `begin` is the offset of the block's first emitted byte;
/// `end` is the offset one past its last, recorded so exception ranges
/// (§3.7's `ExceptInfo`) can describe `[begin, end)` in bytes rather than
/// blocks.
#[derive(Debug, Default, Clone, Copy)]
pub struct Label {
    pub begin: Option<u32>,
    pub end: Option<u32>,
}

impl Label {
    pub fn begin(&self) -> u32 {
        self.begin.expect("label referenced before its block was emitted")
    }
}

/// A forward (or backward) reference recorded at the byte offset where its
/// operand was written, to be patched once every block's `Label.begin` is
/// known. `absolute` distinguishes a `Br`'s `u32` target from `BrCond`'s
/// `i16` pc-relative offset (§4.6).
#[derive(Debug, Clone, Copy)]
pub struct LabelRef {
    pub block: u32,
    pub absolute: bool,
    /// Byte offset of the operand field itself (where the patch is written).
    pub position: u32,
}
