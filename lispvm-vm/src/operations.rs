use lispvm_common::{Instruction, Opcode, OperationKind, VmFault};

use crate::vm::{Effect, Vm};

/// Dispatches a fetched instruction to its class handler, mirroring the
/// arithmetic/logic/transfer/control split the ISA table groups opcodes by.
pub(crate) fn execute(vm: &mut Vm, instruction: Instruction) -> Result<Effect, VmFault> {
    match instruction.op.class() {
        OperationKind::Arithmetic => arithmetic(vm, instruction),
        OperationKind::Logic => logic(vm, instruction),
        OperationKind::Transfer => transfer(vm, instruction),
        OperationKind::Control => control(vm, instruction),
    }
}

fn arithmetic(vm: &mut Vm, instruction: Instruction) -> Result<Effect, VmFault> {
    match instruction.op {
        Opcode::ADD | Opcode::SUB | Opcode::MUL | Opcode::DIV | Opcode::MOD | Opcode::MAX | Opcode::MIN => {
            let a = vm.pop()?;
            let b = vm.pop()?;
            let result = match instruction.op {
                Opcode::ADD => a.wrapping_add(b),
                Opcode::SUB => a.wrapping_sub(b),
                Opcode::MUL => a.wrapping_mul(b),
                Opcode::DIV => {
                    if b == 0 {
                        return Err(VmFault::InvalidOperand { detail: "division by zero".to_string() });
                    }
                    a / b
                }
                Opcode::MOD => {
                    if b == 0 {
                        return Err(VmFault::InvalidOperand { detail: "modulo by zero".to_string() });
                    }
                    a % b
                }
                Opcode::MAX => a.max(b),
                Opcode::MIN => a.min(b),
                _ => unreachable!(),
            };
            vm.push(result);
        }
        Opcode::INC => {
            let a = vm.pop()?;
            vm.push(a.wrapping_add(1));
        }
        Opcode::DEC => {
            let a = vm.pop()?;
            vm.push(a.wrapping_sub(1));
        }
        _ => unreachable!("non-arithmetic opcode routed to the arithmetic handler"),
    }
    Ok(Effect::Advance)
}

fn logic(vm: &mut Vm, instruction: Instruction) -> Result<Effect, VmFault> {
    let a = vm.pop()?;
    let b = vm.pop()?;
    let result = match instruction.op {
        Opcode::LT => a < b,
        Opcode::LE => a <= b,
        Opcode::EQ => a == b,
        Opcode::GE => a >= b,
        Opcode::GT => a > b,
        _ => unreachable!("non-logic opcode routed to the logic handler"),
    };
    vm.push(result as u64);
    Ok(Effect::Advance)
}

fn transfer(vm: &mut Vm, instruction: Instruction) -> Result<Effect, VmFault> {
    match instruction.op {
        Opcode::DROP => {
            vm.pop()?;
        }
        Opcode::DUP => ndup(vm, 2)?,
        Opcode::NDUP => ndup(vm, instruction.operand as usize)?,
        Opcode::SWAP => {
            let a = vm.pop()?;
            let b = vm.pop()?;
            vm.push(a);
            vm.push(b);
        }
        Opcode::ROT => nrot(vm, 3)?,
        Opcode::NROT => nrot(vm, instruction.operand as usize)?,
        Opcode::TUCK => ntuck(vm, 1)?,
        Opcode::NTUCK => ntuck(vm, instruction.operand as usize)?,
        Opcode::SIZE => {
            let depth = vm.data_stack().len() as u64;
            vm.push(depth);
        }
        Opcode::NRND => return Err(VmFault::InvalidInstruction { opcode: Opcode::NRND as u8 }),
        Opcode::PUSH => vm.push(instruction.operand),
        Opcode::FETCH => {
            let address = vm.pop()? as usize;
            let value = vm.read_halfword(address)?;
            vm.push(value);
        }
        _ => unreachable!("non-transfer opcode routed to the transfer handler"),
    }
    Ok(Effect::Advance)
}

/// Pushes the top of stack `n - 1` additional times, leaving `n` total
/// copies where there was one. `n == 0` is a no-op.
fn ndup(vm: &mut Vm, n: usize) -> Result<(), VmFault> {
    if n == 0 {
        return Ok(());
    }
    let top = *vm.data_stack().last().ok_or(VmFault::StackUnderflow)?;
    for _ in 0..n - 1 {
        vm.push(top);
    }
    Ok(())
}

/// Cyclically rotates the top `n` elements: the element on top moves to
/// the bottom of that window, and everything else shifts up by one.
/// `n == 0` is a no-op; `n == 1` is also a no-op (rotating a single
/// element changes nothing).
fn nrot(vm: &mut Vm, n: usize) -> Result<(), VmFault> {
    if n <= 1 {
        return Ok(());
    }
    let len = vm.data_stack().len();
    if len < n {
        return Err(VmFault::StackUnderflow);
    }
    vm.data_stack_mut()[len - n..].rotate_right(1);
    Ok(())
}

/// Inserts a copy of the top element below the `n` elements beneath it,
/// leaving the original top element on top and growing the stack by one.
/// `TUCK` is `n == 1`.
fn ntuck(vm: &mut Vm, n: usize) -> Result<(), VmFault> {
    let window = n + 1;
    let len = vm.data_stack().len();
    if len < window {
        return Err(VmFault::StackUnderflow);
    }
    let top = vm.data_stack()[len - 1];
    vm.data_stack_mut().insert(len - window, top);
    Ok(())
}

fn control(vm: &mut Vm, instruction: Instruction) -> Result<Effect, VmFault> {
    match instruction.op {
        Opcode::CALL => {
            let dest = vm.pop()?;
            let pc = vm.pc() + lispvm_common::INSTRUCTION_SIZE;
            vm.push_return(pc as u64);
            vm.set_pc(dest as usize);
            Ok(Effect::Handled)
        }
        Opcode::RET => {
            let dest = vm.pop_return()?;
            vm.set_pc(dest as usize);
            Ok(Effect::Handled)
        }
        Opcode::JMP => {
            let dest = vm.pop()?;
            vm.set_pc(dest as usize);
            Ok(Effect::Handled)
        }
        Opcode::CJMP => {
            let condition = vm.pop()?;
            let dest = vm.pop()?;
            if condition != 0 {
                vm.set_pc(dest as usize);
                Ok(Effect::Handled)
            } else {
                Ok(Effect::Advance)
            }
        }
        Opcode::WAIT => Ok(Effect::Handled),
        Opcode::HALT => Ok(Effect::Halted),
        _ => unreachable!("non-control opcode routed to the control handler"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::Vm as VmUnderTest;
    use lispvm_common::Instruction as Instr;

    #[test]
    fn ndup_with_n_equal_two_matches_plain_dup() {
        let mut vm = VmUnderTest::new(vec![Instr::new(Opcode::PUSH, 9), Instr::new(Opcode::NDUP, 2), Instr::bare(Opcode::HALT)], Vec::new());
        vm.run_to_halt();
        assert_eq!(vm.data_stack(), &[9, 9]);
    }

    #[test]
    fn rot_cycles_the_top_three_elements() {
        let mut vm = VmUnderTest::new(
            vec![
                Instr::new(Opcode::PUSH, 1),
                Instr::new(Opcode::PUSH, 2),
                Instr::new(Opcode::PUSH, 3),
                Instr::bare(Opcode::ROT),
                Instr::bare(Opcode::HALT),
            ],
            Vec::new(),
        );
        vm.run_to_halt();
        assert_eq!(vm.data_stack(), &[3, 1, 2]);
    }

    #[test]
    fn tuck_inserts_a_copy_of_the_top_below_the_second() {
        let mut vm = VmUnderTest::new(
            vec![Instr::new(Opcode::PUSH, 1), Instr::new(Opcode::PUSH, 2), Instr::bare(Opcode::TUCK), Instr::bare(Opcode::HALT)],
            Vec::new(),
        );
        vm.run_to_halt();
        assert_eq!(vm.data_stack(), &[2, 1, 2]);
    }

    #[test]
    fn size_pushes_the_current_stack_depth() {
        let mut vm = VmUnderTest::new(
            vec![Instr::new(Opcode::PUSH, 1), Instr::new(Opcode::PUSH, 2), Instr::bare(Opcode::SIZE), Instr::bare(Opcode::HALT)],
            Vec::new(),
        );
        vm.run_to_halt();
        assert_eq!(vm.data_stack(), &[1, 2, 2]);
    }

    #[test]
    fn nrnd_is_an_invalid_instruction() {
        let mut vm = VmUnderTest::new(vec![Instr::new(Opcode::NRND, 0)], Vec::new());
        assert_eq!(vm.run_to_halt(), crate::vm::MachineState::InvalidInstruction);
    }

    #[test]
    fn division_by_zero_is_an_invalid_operand() {
        let mut vm = VmUnderTest::new(
            vec![Instr::new(Opcode::PUSH, 1), Instr::new(Opcode::PUSH, 0), Instr::bare(Opcode::DIV)],
            Vec::new(),
        );
        assert_eq!(vm.run_to_halt(), crate::vm::MachineState::InvalidOperand);
    }
}
