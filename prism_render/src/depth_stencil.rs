/// How a new value is compared against the one already in the attachment.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Never,
    Less,
    Equal,
    LessEqual,
    Greater,
    NotEqual,
    GreaterEqual,
    Always,
}

impl CompareOp {
    pub fn passes<T: PartialOrd>(self, new: T, current: T) -> bool {
        match self {
            Self::Never => false,
            Self::Less => new < current,
            Self::Equal => new == current,
            Self::LessEqual => new <= current,
            Self::Greater => new > current,
            Self::NotEqual => new != current,
            Self::GreaterEqual => new >= current,
            Self::Always => true,
        }
    }
}

/// How the stencil value is updated after the depth/stencil tests.
///
/// The stencil attachment is 8 bits wide; clamping and wrapping operate on
/// that range.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum StencilOp {
    /// Don't modify the current stencil value.
    Keep,
    /// Reset the stencil value to zero.
    Zero,
    /// Reset the stencil value to the reference value.
    Replace,
    /// Increment the current stencil value, clamping at the maximum.
    IncrementClamp,
    /// Decrement the current stencil value, clamping at zero.
    DecrementClamp,
    /// Bitwise-invert the current stencil value.
    Invert,
    /// Increment the current stencil value, wrapping to zero at the maximum.
    IncrementWrap,
    /// Decrement the current stencil value, wrapping to the maximum at zero.
    DecrementWrap,
}

impl StencilOp {
    pub fn apply(self, current: u32, reference: u32) -> u32 {
        const MAX: u32 = u8::MAX as u32;

        match self {
            Self::Keep => current,
            Self::Zero => 0,
            Self::Replace => reference,
            Self::IncrementClamp => {
                if current >= MAX {
                    MAX
                } else {
                    current + 1
                }
            }
            Self::DecrementClamp => current.saturating_sub(1),
            Self::Invert => !current,
            Self::IncrementWrap => {
                if current >= MAX {
                    0
                } else {
                    current + 1
                }
            }
            Self::DecrementWrap => {
                if current == 0 {
                    MAX
                } else {
                    current - 1
                }
            }
        }
    }
}

/// Depth test configuration of a pipeline.
///
/// When the test is disabled all access to the depth attachment is disabled,
/// including writes.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct DepthState {
    pub test_enabled: bool,
    pub compare: CompareOp,
    pub write_enabled: bool,
}

impl Default for DepthState {
    fn default() -> Self {
        Self {
            test_enabled: false,
            compare: CompareOp::LessEqual,
            write_enabled: true,
        }
    }
}

/// Stencil test configuration of a pipeline.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct StencilState {
    pub test_enabled: bool,
    /// Applied to the masked current value and the masked reference value.
    pub compare: CompareOp,
    /// Performed when the stencil test fails.
    pub fail_op: StencilOp,
    /// Performed when the stencil test passes but the depth test fails.
    pub depth_fail_op: StencilOp,
    /// Performed when both tests pass.
    pub pass_op: StencilOp,
    /// Masks both operands of the comparison.
    pub read_mask: u32,
    /// Masks the value written back to the stencil attachment.
    pub write_mask: u32,
}

impl Default for StencilState {
    fn default() -> Self {
        Self {
            test_enabled: false,
            compare: CompareOp::Always,
            fail_op: StencilOp::Keep,
            depth_fail_op: StencilOp::Keep,
            pass_op: StencilOp::Keep,
            read_mask: !0,
            write_mask: !0,
        }
    }
}

impl StencilState {
    pub fn select_operation(&self, depth_passes: bool, stencil_passes: bool) -> StencilOp {
        if stencil_passes {
            if depth_passes {
                self.pass_op
            } else {
                self.depth_fail_op
            }
        } else {
            self.fail_op
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CompareOp, StencilOp, StencilState};

    #[test]
    fn compare_op_passes() {
        assert!(!CompareOp::Never.passes(1, 1));
        assert!(CompareOp::Always.passes(1, 2));
        assert!(CompareOp::Less.passes(1.0, 2.0));
        assert!(!CompareOp::Less.passes(2.0, 2.0));
        assert!(CompareOp::LessEqual.passes(2.0, 2.0));
        assert!(CompareOp::Greater.passes(3, 2));
        assert!(CompareOp::GreaterEqual.passes(2, 2));
        assert!(CompareOp::Equal.passes(2, 2));
        assert!(CompareOp::NotEqual.passes(1, 2));
    }

    #[test]
    fn stencil_op_clamps_to_eight_bits() {
        assert_eq!(StencilOp::IncrementClamp.apply(254, 0), 255);
        assert_eq!(StencilOp::IncrementClamp.apply(255, 0), 255);
        assert_eq!(StencilOp::IncrementWrap.apply(255, 0), 0);
        assert_eq!(StencilOp::DecrementClamp.apply(0, 0), 0);
        assert_eq!(StencilOp::DecrementWrap.apply(0, 0), 255);
        assert_eq!(StencilOp::Replace.apply(7, 42), 42);
        assert_eq!(StencilOp::Zero.apply(7, 42), 0);
    }

    #[test]
    fn stencil_state_selects_the_operation() {
        let state = StencilState {
            fail_op: StencilOp::Zero,
            depth_fail_op: StencilOp::Invert,
            pass_op: StencilOp::IncrementClamp,
            ..Default::default()
        };

        assert_eq!(state.select_operation(true, true), StencilOp::IncrementClamp);
        assert_eq!(state.select_operation(false, true), StencilOp::Invert);
        assert_eq!(state.select_operation(true, false), StencilOp::Zero);
        assert_eq!(state.select_operation(false, false), StencilOp::Zero);
    }
}
