/*!
config: reified build-time configuration.

The original source gates several behaviors behind C preprocessor flags
(`W65C02S_COARSE`, `W65C02S_COARSE_CYCLE_COUNTER`, `W65C02S_HOOK_BRK`,
`W65C02S_HOOK_STP`, `W65C02S_HOOK_EOI`). This crate reifies the hook
toggles as Cargo features (`hook-brk`, `hook-stp`, `hook-eoi`) checked at
compile time by `Cpu::hook_brk`/`hook_stp`/`hook_end_of_instruction`
(each still returns whether the feature is compiled in, exactly like the
original's boolean return), and the cycle-counter granularity as the
`coarse-cycle-counter` feature. The executor granularity (cycle vs
instruction) is not a build-time choice here: both `run_cycles` and
`run_instructions`/`step_instruction` are always available side by side,
since the crate's single cycle-stepping interpreter (see `exec`) makes
either one a thin wrapper with no extra cost to keep both compiled in.
*/

/// Hook function types. Matches the original's callback signatures:
/// `hook_brk` may veto BRK handling (treat it as NOP), `hook_stp` may
/// veto STP, `hook_eoi` is a pure observer.
pub type BrkHook<H> = fn(&mut H, opcode_operand: u8) -> bool;
pub type StpHook<H> = fn(&mut H) -> bool;
pub type EoiHook<H> = fn(&mut H);

/// Installed hooks. Each slot compiles away entirely when its matching
/// feature is disabled.
pub struct Hooks<H> {
    #[cfg(feature = "hook-brk")]
    pub brk: Option<BrkHook<H>>,
    #[cfg(feature = "hook-stp")]
    pub stp: Option<StpHook<H>>,
    #[cfg(feature = "hook-eoi")]
    pub eoi: Option<EoiHook<H>>,
    #[cfg(not(any(feature = "hook-brk", feature = "hook-stp", feature = "hook-eoi")))]
    _marker: core::marker::PhantomData<H>,
}

impl<H> Default for Hooks<H> {
    fn default() -> Self {
        Hooks {
            #[cfg(feature = "hook-brk")]
            brk: None,
            #[cfg(feature = "hook-stp")]
            stp: None,
            #[cfg(feature = "hook-eoi")]
            eoi: None,
            #[cfg(not(any(feature = "hook-brk", feature = "hook-stp", feature = "hook-eoi")))]
            _marker: core::marker::PhantomData,
        }
    }
}

/// Whether `hook_brk` is compiled into this build.
#[inline]
pub const fn brk_hook_available() -> bool {
    cfg!(feature = "hook-brk")
}

/// Whether `hook_stp` is compiled into this build.
#[inline]
pub const fn stp_hook_available() -> bool {
    cfg!(feature = "hook-stp")
}

/// Whether `hook_end_of_instruction` is compiled into this build.
#[inline]
pub const fn eoi_hook_available() -> bool {
    cfg!(feature = "hook-eoi")
}

/// Whether `total_cycles` is updated once per batch (`run_cycles`/
/// `run_instructions`/`step_instruction`) rather than every bus cycle.
/// Coarse counting is cheaper but makes the counter unreadable from
/// inside a bus hook mid-batch.
#[inline]
pub const fn coarse_cycle_counter() -> bool {
    cfg!(feature = "coarse-cycle-counter")
}
