/*!
interrupt: host-facing interrupt/reset pins and the halt (WAI/STOP)
controller.

`nmi`/`irq`/`irq_cancel`/`reset`/`set_overflow` are the five pin-level
inputs a host uses to drive the CPU's interrupt state. IRQ is
level-triggered (stays asserted until the host calls `irq_cancel`); NMI is
edge-triggered (a single pulse, cleared the instant it is serviced).
Precedence at an instruction boundary is RESET > NMI > IRQ; a concurrently
pending NMI can still hijack an in-flight IRQ entry at cycle 5 of the
shared `STACK_BRK` sequence (handled in `exec`).
*/

use super::state::{CpuCore, OVERFLOW, STATE_IRQ, STATE_NMI, STATE_RESET, STATE_WAIT};

/// Host asserts NMI. Edge-triggered: if the CPU is in WAIT, it wakes and
/// latches NMI immediately (NMI is never masked).
pub fn nmi(cpu: &mut CpuCore) {
    cpu.int_trig |= STATE_NMI;
    if cpu.run_mode() == STATE_WAIT {
        cpu.set_run_mode(super::state::STATE_RUN);
        cpu.cpu_state |= STATE_NMI;
    }
}

/// Host asserts IRQ. Level-triggered: stays pending until `irq_cancel`.
/// If the CPU is in WAIT, it wakes, but the interrupt is latched only if
/// the mask (i.e. `P.I == 0`) allows it — matching the data sheet's
/// "wakes even with I=1, but isn't serviced until I is cleared" behavior.
pub fn irq(cpu: &mut CpuCore) {
    cpu.int_trig |= STATE_IRQ;
    if cpu.run_mode() == STATE_WAIT {
        cpu.set_run_mode(super::state::STATE_RUN);
        cpu.cpu_state |= STATE_IRQ & cpu.int_mask;
    }
}

/// Host deasserts IRQ.
pub fn irq_cancel(cpu: &mut CpuCore) {
    cpu.int_trig &= !STATE_IRQ;
}

/// Host requests a reset. Takes effect at the next instruction boundary;
/// clears any latched NMI/IRQ (RESET subsumes them).
pub fn reset(cpu: &mut CpuCore) {
    cpu.set_run_mode(STATE_RESET);
    cpu.clear_latched_irq();
    cpu.clear_latched_nmi();
}

/// Simulates the S/O pin: forces V=1.
pub fn set_overflow(cpu: &mut CpuCore) {
    cpu.p |= OVERFLOW;
}

/// Which hardware-interrupt entry (if any) should be serviced next,
/// checked at an instruction boundary. `None` means "fetch the next
/// opcode normally".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingEntry {
    Reset,
    Nmi,
    Irq,
}

/// Precedence: RESET > NMI > IRQ.
pub fn pending_entry(cpu: &CpuCore) -> Option<PendingEntry> {
    if cpu.run_mode() == STATE_RESET {
        Some(PendingEntry::Reset)
    } else if cpu.has_latched_nmi() {
        Some(PendingEntry::Nmi)
    } else if cpu.has_latched_irq() {
        Some(PendingEntry::Irq)
    } else {
        None
    }
}

/// Mark the CPU as beginning to service `entry`, mirroring
/// `w65c02s_handle_reset`/`_nmi`/`_irq`: sets the matching `in_*` flag and
/// clears the corresponding trigger/latch bits (RESET additionally forces
/// run-mode to RUN and clears both latches since it subsumes them).
pub fn begin_servicing(cpu: &mut CpuCore, entry: PendingEntry) {
    match entry {
        PendingEntry::Reset => {
            cpu.in_rst = true;
            cpu.in_nmi = false;
            cpu.in_irq = false;
            cpu.set_run_mode(super::state::STATE_RUN);
            cpu.clear_latched_nmi();
            cpu.clear_latched_irq();
        }
        PendingEntry::Nmi => {
            cpu.in_nmi = true;
            cpu.int_trig &= !STATE_NMI;
            cpu.clear_latched_nmi();
        }
        PendingEntry::Irq => {
            cpu.in_irq = true;
            cpu.clear_latched_irq();
        }
    }
}
