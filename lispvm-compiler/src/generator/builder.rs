use lispvm_common::{Instruction, Opcode, INSTRUCTION_SIZE};

/// Opaque handle to a not-yet-resolved byte address, either the start of
/// some future instruction (a code label) or a slot in the data segment (a
/// data label). Mirrors the teacher's label/reference/resolve pattern: a
/// label is created before its address is known, references record where
/// to patch once it is, and a single finalize pass writes every patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LabelId(usize);

#[derive(Debug, Clone, Copy)]
enum LabelTarget {
    Unresolved,
    Code { instruction_index: usize },
    Data { offset: usize },
}

/// Where an outstanding patch should be written once its label resolves.
#[derive(Debug, Clone, Copy)]
enum PatchSite {
    /// Patch the operand of instruction `index`.
    Instruction(usize),
    /// Patch 2 little-endian bytes of the data segment at `offset`.
    DataHalfword(usize),
}

/// Two-pass instruction/data-segment builder: emit freely during a single
/// walk of the Core IR, then `finalize` once to resolve every label
/// reference into a concrete byte address.
pub struct Builder {
    instructions: Vec<Instruction>,
    data: Vec<u8>,
    labels: Vec<LabelTarget>,
    patches: Vec<(LabelId, PatchSite)>,
}

impl Builder {
    pub fn new() -> Self {
        Self {
            instructions: Vec::new(),
            data: Vec::new(),
            labels: Vec::new(),
            patches: Vec::new(),
        }
    }

    pub fn create_label(&mut self) -> LabelId {
        self.labels.push(LabelTarget::Unresolved);
        LabelId(self.labels.len() - 1)
    }

    /// Bind `label` to the address of the next instruction to be emitted.
    pub fn set_label(&mut self, label: LabelId) {
        self.labels[label.0] = LabelTarget::Code { instruction_index: self.instructions.len() };
    }

    /// Bind `label` to a fixed data-segment byte offset, reserving 2 bytes
    /// there for it (matching `FETCH`'s 16-bit half-word read).
    pub fn allocate_data_label(&mut self) -> LabelId {
        let label = self.create_label();
        let offset = self.data.len();
        self.data.extend_from_slice(&[0u8, 0u8]);
        self.labels[label.0] = LabelTarget::Data { offset };
        label
    }

    /// Emit an instruction, returning its index.
    pub fn emit(&mut self, instruction: Instruction) -> usize {
        self.instructions.push(instruction);
        self.instructions.len() - 1
    }

    /// Emit `PUSH 0` whose operand will be patched to `label`'s resolved
    /// byte address once known.
    pub fn emit_push_reference(&mut self, label: LabelId) -> usize {
        let index = self.emit(Instruction::bare(Opcode::PUSH));
        self.patches.push((label, PatchSite::Instruction(index)));
        index
    }

    /// Record that instruction `index`'s operand should be patched to
    /// `label`'s resolved byte address once known.
    pub fn reference(&mut self, label: LabelId, index: usize) {
        self.patches.push((label, PatchSite::Instruction(index)));
    }

    /// Write `label`'s resolved address into the data label's reserved
    /// half-word once known.
    pub fn reference_data(&mut self, label: LabelId, data_label: LabelId) {
        if let LabelTarget::Data { offset } = self.labels[data_label.0] {
            self.patches.push((label, PatchSite::DataHalfword(offset)));
        } else {
            panic!("reference_data target is not a data label");
        }
    }

    /// Write an already-known value into a data label's reserved
    /// half-word immediately, with no patch needed at finalize.
    pub fn write_data_immediate(&mut self, data_label: LabelId, value: u64) {
        if let LabelTarget::Data { offset } = self.labels[data_label.0] {
            let half = (value & 0xFFFF) as u16;
            self.data[offset..offset + 2].copy_from_slice(&half.to_le_bytes());
        } else {
            panic!("write_data_immediate target is not a data label");
        }
    }

    pub fn current_instruction_index(&self) -> usize {
        self.instructions.len()
    }

    /// Resolve every outstanding label reference and return the finished
    /// instruction stream and data segment.
    pub fn finalize(mut self) -> (Vec<Instruction>, Vec<u8>) {
        let code_len = self.instructions.len() * INSTRUCTION_SIZE;
        let resolved: Vec<u64> = self
            .labels
            .iter()
            .map(|target| match target {
                LabelTarget::Unresolved => panic!("label used without ever being set"),
                LabelTarget::Code { instruction_index } => (instruction_index * INSTRUCTION_SIZE) as u64,
                LabelTarget::Data { offset } => (code_len + offset) as u64,
            })
            .collect();

        for (label, site) in self.patches {
            let address = resolved[label.0];
            match site {
                PatchSite::Instruction(index) => {
                    self.instructions[index].operand = address;
                }
                PatchSite::DataHalfword(offset) => {
                    let half = (address & 0xFFFF) as u16;
                    self.data[offset..offset + 2].copy_from_slice(&half.to_le_bytes());
                }
            }
        }
        (self.instructions, self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_label_resolves_to_instruction_boundary() {
        let mut builder = Builder::new();
        builder.emit(Instruction::bare(Opcode::PUSH));
        let label = builder.create_label();
        builder.set_label(label);
        let patched_at = builder.emit_push_reference(label);
        builder.emit(Instruction::bare(Opcode::HALT));
        let (instructions, _) = builder.finalize();
        assert_eq!(instructions[patched_at].operand, (1 * INSTRUCTION_SIZE) as u64);
    }

    #[test]
    fn data_label_resolves_after_the_code_segment() {
        let mut builder = Builder::new();
        builder.emit(Instruction::bare(Opcode::HALT));
        let data_label = builder.allocate_data_label();
        let patched_at = builder.emit_push_reference(data_label);
        let (instructions, data) = builder.finalize();
        assert_eq!(instructions[patched_at].operand, INSTRUCTION_SIZE as u64);
        assert_eq!(data.len(), 2);
    }
}
