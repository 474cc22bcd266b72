/*!
bus: the host collaboration seam for the W65C02S core.

The CPU never models a memory map, peripherals, or DMA; it only ever calls
out to a read and a write hook, exactly once per emulated bus cycle,
including the "spurious" reads addressing-mode sequences perform to match
silicon. A host that needs to observe or react to those spurious accesses
(e.g. a bus-dump tool) can do so here; this crate does not provide one.

Implementations MUST NOT call back into the CPU's own `run_*`/`step_*`
entry points from inside `read`/`write` — that is a reentrant contract
violation (see `Cpu::running` in `cpu::state`).
*/

/// Host-provided memory bus. `H` in `Cpu<H>` must implement this.
pub trait Bus {
    /// Read one byte from `address`. Invoked exactly once per bus cycle.
    fn read(&mut self, address: u16) -> u8;

    /// Write `value` to `address`. Invoked exactly once per bus cycle.
    fn write(&mut self, address: u16, value: u8);
}

/// Open-bus stand-in used when a host has no memory wired up yet: reads
/// return `0xFF`, writes are discarded. Mirrors the original's null-hook
/// substitution (`w65c02s_openbus_read`/`_write`).
#[derive(Debug, Default, Clone, Copy)]
pub struct OpenBus;

impl Bus for OpenBus {
    #[inline]
    fn read(&mut self, _address: u16) -> u8 {
        0xFF
    }

    #[inline]
    fn write(&mut self, _address: u16, _value: u8) {}
}
