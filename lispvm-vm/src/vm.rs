use lispvm_common::{Instruction, VmFault, INSTRUCTION_SIZE};

use crate::operations;

/// The VM's run state. Mirrors the spec's machine-state enum one-to-one
/// except for `StackOverflow`: nothing in this design bounds either stack's
/// depth, so that state is unreachable and was dropped rather than carried
/// as dead code (see DESIGN.md).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachineState {
    Okay,
    Halt,
    StackUnderflow,
    InvalidAddress,
    InvalidInstruction,
    InvalidOperand,
}

impl From<VmFault> for MachineState {
    fn from(fault: VmFault) -> Self {
        match fault {
            VmFault::StackUnderflow => MachineState::StackUnderflow,
            VmFault::InvalidAddress { .. } => MachineState::InvalidAddress,
            VmFault::InvalidInstruction { .. } => MachineState::InvalidInstruction,
            VmFault::InvalidOperand { .. } => MachineState::InvalidOperand,
        }
    }
}

/// Whether a handler already repositioned `pc` itself (a taken jump, a
/// call, a return, `wait`, `halt`) or expects the fetch-execute loop to
/// advance it by one instruction width, the ordinary case.
pub(crate) enum Effect {
    Advance,
    Handled,
    Halted,
}

/// A stack machine executing the fixed 9-byte-per-instruction wire format
/// over byte-addressed memory. Holds no notion of the source program that
/// produced its bytes; it only ever sees opcodes and operands.
pub struct Vm {
    pc: usize,
    memory: Vec<u8>,
    data_stack: Vec<u64>,
    return_stack: Vec<u64>,
    state: MachineState,
}

impl Vm {
    /// Assembles `instructions` and `data` into one contiguous byte-addressed
    /// memory, instructions first, with `pc` starting at byte 0.
    pub fn new(instructions: Vec<Instruction>, data: Vec<u8>) -> Self {
        let mut memory = Vec::with_capacity(instructions.len() * INSTRUCTION_SIZE + data.len());
        for instruction in &instructions {
            memory.extend_from_slice(&instruction.to_bytes());
        }
        memory.extend_from_slice(&data);
        Self { pc: 0, memory, data_stack: Vec::new(), return_stack: Vec::new(), state: MachineState::Okay }
    }

    pub fn state(&self) -> MachineState {
        self.state
    }

    pub fn pc(&self) -> usize {
        self.pc
    }

    pub fn data_stack(&self) -> &[u64] {
        &self.data_stack
    }

    pub fn return_stack(&self) -> &[u64] {
        &self.return_stack
    }

    pub(crate) fn pop(&mut self) -> Result<u64, VmFault> {
        self.data_stack.pop().ok_or(VmFault::StackUnderflow)
    }

    pub(crate) fn push(&mut self, value: u64) {
        self.data_stack.push(value);
    }

    pub(crate) fn pop_return(&mut self) -> Result<u64, VmFault> {
        self.return_stack.pop().ok_or(VmFault::StackUnderflow)
    }

    pub(crate) fn push_return(&mut self, value: u64) {
        self.return_stack.push(value);
    }

    pub(crate) fn data_stack_mut(&mut self) -> &mut Vec<u64> {
        &mut self.data_stack
    }

    pub(crate) fn set_pc(&mut self, pc: usize) {
        self.pc = pc;
    }

    pub(crate) fn read_halfword(&self, address: usize) -> Result<u64, VmFault> {
        let bytes = self
            .memory
            .get(address..address + 2)
            .ok_or(VmFault::InvalidAddress { pc: address as u64 })?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]) as u64)
    }

    /// Runs exactly one fetch-execute step. A no-op once `state` is
    /// anything but `Okay` — callers drive `run_to_halt` or step manually
    /// and inspect `state()` after either.
    pub fn advance(&mut self) {
        if self.state != MachineState::Okay {
            return;
        }

        let Some(bytes) = self.memory.get(self.pc..self.pc + INSTRUCTION_SIZE) else {
            self.state = MachineState::InvalidAddress;
            return;
        };
        let mut buf = [0u8; INSTRUCTION_SIZE];
        buf.copy_from_slice(bytes);
        let Some(instruction) = Instruction::from_bytes(&buf) else {
            self.state = MachineState::InvalidInstruction;
            return;
        };

        let outcome = operations::execute(self, instruction);
        match outcome {
            Ok(Effect::Advance) => self.pc += INSTRUCTION_SIZE,
            Ok(Effect::Handled) => {}
            Ok(Effect::Halted) => self.state = MachineState::Halt,
            Err(fault) => self.state = fault.into(),
        }
    }

    /// Steps until the VM halts or faults.
    pub fn run_to_halt(&mut self) -> MachineState {
        while self.state == MachineState::Okay {
            self.advance();
        }
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lispvm_common::Opcode;

    #[test]
    fn addition_program_halts_with_five_on_the_stack() {
        let program = vec![
            Instruction::new(Opcode::PUSH, 2),
            Instruction::new(Opcode::PUSH, 3),
            Instruction::bare(Opcode::ADD),
            Instruction::bare(Opcode::HALT),
        ];
        let mut vm = Vm::new(program, Vec::new());
        assert_eq!(vm.run_to_halt(), MachineState::Halt);
        assert_eq!(vm.data_stack(), &[5]);
        assert_eq!(vm.pc(), 3 * INSTRUCTION_SIZE);
    }

    #[test]
    fn conditional_jump_program_halts_with_one_on_the_stack() {
        let program = vec![
            Instruction::new(Opcode::PUSH, 3),
            Instruction::new(Opcode::PUSH, 2),
            Instruction::bare(Opcode::LT),
            Instruction::new(Opcode::PUSH, (8 * INSTRUCTION_SIZE) as u64),
            Instruction::bare(Opcode::SWAP),
            Instruction::bare(Opcode::CJMP),
            Instruction::new(Opcode::PUSH, 0),
            Instruction::bare(Opcode::HALT),
            Instruction::new(Opcode::PUSH, 1),
            Instruction::bare(Opcode::HALT),
        ];
        let mut vm = Vm::new(program, Vec::new());
        assert_eq!(vm.run_to_halt(), MachineState::Halt);
        assert_eq!(vm.data_stack(), &[1]);
    }

    #[test]
    fn drop_on_an_empty_stack_is_a_stack_underflow() {
        let mut vm = Vm::new(vec![Instruction::bare(Opcode::DROP)], Vec::new());
        assert_eq!(vm.run_to_halt(), MachineState::StackUnderflow);
    }

    #[test]
    fn halt_leaves_pc_at_the_halt_instruction() {
        let mut vm = Vm::new(vec![Instruction::bare(Opcode::HALT)], Vec::new());
        assert_eq!(vm.run_to_halt(), MachineState::Halt);
        assert_eq!(vm.pc(), 0);
    }

    #[test]
    fn cjmp_with_a_false_condition_falls_through() {
        let program = vec![
            Instruction::new(Opcode::PUSH, (3 * INSTRUCTION_SIZE) as u64),
            Instruction::new(Opcode::PUSH, 0),
            Instruction::bare(Opcode::CJMP),
            Instruction::bare(Opcode::HALT),
        ];
        let mut vm = Vm::new(program, Vec::new());
        assert_eq!(vm.run_to_halt(), MachineState::Halt);
        assert_eq!(vm.pc(), 3 * INSTRUCTION_SIZE);
    }

    #[test]
    fn fetch_reads_a_little_endian_halfword_from_the_data_segment() {
        let program = vec![Instruction::new(Opcode::PUSH, (3 * INSTRUCTION_SIZE) as u64), Instruction::bare(Opcode::FETCH), Instruction::bare(Opcode::HALT)];
        let data = vec![0x34, 0x12];
        let mut vm = Vm::new(program, data);
        assert_eq!(vm.run_to_halt(), MachineState::Halt);
        assert_eq!(vm.data_stack(), &[0x1234]);
    }

    #[test]
    fn call_then_ret_returns_to_the_instruction_after_the_call() {
        let program = vec![
            Instruction::new(Opcode::PUSH, (3 * INSTRUCTION_SIZE) as u64),
            Instruction::bare(Opcode::CALL),
            Instruction::bare(Opcode::HALT),
            Instruction::bare(Opcode::RET),
        ];
        let mut vm = Vm::new(program, Vec::new());
        assert_eq!(vm.run_to_halt(), MachineState::Halt);
        assert_eq!(vm.pc(), 2 * INSTRUCTION_SIZE);
    }

    #[test]
    fn invalid_opcode_byte_is_an_invalid_instruction_fault() {
        let mut memory_only_program = Vm::new(Vec::new(), Vec::new());
        memory_only_program.memory = vec![255u8; INSTRUCTION_SIZE];
        assert_eq!(memory_only_program.run_to_halt(), MachineState::InvalidInstruction);
    }

    #[test]
    fn pc_running_off_the_end_of_memory_is_an_invalid_address_fault() {
        let mut vm = Vm::new(vec![Instruction::bare(Opcode::ADD)], Vec::new());
        vm.memory.truncate(3);
        assert_eq!(vm.run_to_halt(), MachineState::InvalidAddress);
    }
}
