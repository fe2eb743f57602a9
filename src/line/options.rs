use bitflags::bitflags;

use super::trigger::{Trigger, TriggerFlags};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Input,
    Output,
}

/// Physical level written to or read from a `value` node
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Level {
    #[default]
    Low,
    High,
}

impl Level {
    pub const fn new(is_high: bool) -> Self {
        if is_high {
            Self::High
        } else {
            Self::Low
        }
    }

    pub const fn is_high(self) -> bool {
        matches!(self, Level::High)
    }

    pub const fn digit(self) -> u8 {
        match self {
            Level::Low => b'0',
            Level::High => b'1',
        }
    }
}

impl From<bool> for Level {
    #[inline(always)]
    fn from(is_high: bool) -> Self {
        Self::new(is_high)
    }
}

impl std::ops::Not for Level {
    type Output = Level;

    fn not(self) -> Level {
        Level::new(!self.is_high())
    }
}

/// Which optional attribute nodes a line exposes
///
/// Discovered when the line is requested, never assumed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub alterable_direction: bool,
    pub alterable_edge: bool,
}

/// Direction to apply when requesting a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestDirection {
    Input,
    Output { initial: Level },
}

/// Configuration applied by [`Line::request_one`](super::Line::request_one)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineConfig {
    pub direction: RequestDirection,
    /// Applied only if the line exposes an `edge` node
    pub trigger: Trigger,
}

impl LineConfig {
    pub const fn input() -> Self {
        Self {
            direction: RequestDirection::Input,
            trigger: Trigger::None,
        }
    }

    pub const fn output(initial: Level) -> Self {
        Self {
            direction: RequestDirection::Output { initial },
            trigger: Trigger::None,
        }
    }

    pub const fn with_trigger(self, trigger: Trigger) -> Self {
        Self { trigger, ..self }
    }
}

bitflags! {
    /// Request flags in the layout of the kernel's `GPIOF_*` constants
    ///
    /// An empty set requests an output driven low with no trigger.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct RequestFlags: u32 {
        const DIR_IN = (1 << 0);
        const INIT_HIGH = (1 << 1);
        const TRIG_FALL = (1 << 2);
        const TRIG_RISE = (1 << 3);
    }
}

impl RequestFlags {
    pub const IN: Self = Self::DIR_IN;
    pub const OUT_INIT_LOW: Self = Self::empty();
    pub const OUT_INIT_HIGH: Self = Self::INIT_HIGH;
    pub const TRIG_BOTH: Self = Self::TRIG_FALL.union(Self::TRIG_RISE);

    pub const fn trigger(self) -> Trigger {
        let mut flags = TriggerFlags::empty();
        if self.contains(Self::TRIG_FALL) {
            flags = flags.union(TriggerFlags::FALLING);
        }
        if self.contains(Self::TRIG_RISE) {
            flags = flags.union(TriggerFlags::RISING);
        }
        Trigger::from_flags(flags)
    }
}

impl From<RequestFlags> for LineConfig {
    fn from(flags: RequestFlags) -> Self {
        let config = if flags.contains(RequestFlags::DIR_IN) {
            LineConfig::input()
        } else {
            LineConfig::output(Level::new(flags.contains(RequestFlags::INIT_HIGH)))
        };
        config.with_trigger(flags.trigger())
    }
}

impl From<LineConfig> for RequestFlags {
    fn from(config: LineConfig) -> Self {
        let mut flags = match config.direction {
            RequestDirection::Input => RequestFlags::DIR_IN,
            RequestDirection::Output {
                initial: Level::High,
            } => RequestFlags::INIT_HIGH,
            RequestDirection::Output {
                initial: Level::Low,
            } => RequestFlags::empty(),
        };
        let trigger = config.trigger.flags();
        flags.set(
            RequestFlags::TRIG_FALL,
            trigger.contains(TriggerFlags::FALLING),
        );
        flags.set(
            RequestFlags::TRIG_RISE,
            trigger.contains(TriggerFlags::RISING),
        );
        flags
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_map_onto_config() {
        assert_eq!(LineConfig::from(RequestFlags::IN), LineConfig::input());
        assert_eq!(
            LineConfig::from(RequestFlags::OUT_INIT_LOW),
            LineConfig::output(Level::Low)
        );
        assert_eq!(
            LineConfig::from(RequestFlags::OUT_INIT_HIGH | RequestFlags::TRIG_RISE),
            LineConfig::output(Level::High).with_trigger(Trigger::Rising)
        );
        assert_eq!(
            LineConfig::from(RequestFlags::IN | RequestFlags::TRIG_BOTH),
            LineConfig::input().with_trigger(Trigger::Both)
        );
    }

    #[test]
    fn config_maps_back_onto_flags() {
        let config = LineConfig::input().with_trigger(Trigger::Falling);
        assert_eq!(
            RequestFlags::from(config),
            RequestFlags::DIR_IN | RequestFlags::TRIG_FALL
        );
        assert_eq!(
            RequestFlags::from(LineConfig::output(Level::High)),
            RequestFlags::OUT_INIT_HIGH
        );
    }

    #[test]
    fn level_digits() {
        assert_eq!(Level::from(true).digit(), b'1');
        assert_eq!((!Level::High).digit(), b'0');
    }
}
