//! Edge trigger configuration and its textual form in the `edge` node.

use bitflags::bitflags;
use bstr::ByteSlice;

bitflags! {
    /// Bit-pair form of a trigger
    ///
    /// Matches the `GPIOF_TRIG_*` bits of [`RequestFlags`](super::options::RequestFlags).
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TriggerFlags: u8 {
        const FALLING = (1 << 0);
        const RISING = (1 << 1);
    }
}

/// The signal transition which arms an edge notification on a line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Trigger {
    #[default]
    None,
    Falling,
    Rising,
    Both,
}

impl Trigger {
    pub const ALL: [Trigger; 4] = [
        Trigger::None,
        Trigger::Falling,
        Trigger::Rising,
        Trigger::Both,
    ];

    /// The canonical name written to and read from the `edge` node
    pub const fn name(self) -> &'static str {
        match self {
            Trigger::None => "none",
            Trigger::Falling => "falling",
            Trigger::Rising => "rising",
            Trigger::Both => "both",
        }
    }

    pub const fn flags(self) -> TriggerFlags {
        match self {
            Trigger::None => TriggerFlags::empty(),
            Trigger::Falling => TriggerFlags::FALLING,
            Trigger::Rising => TriggerFlags::RISING,
            Trigger::Both => TriggerFlags::FALLING.union(TriggerFlags::RISING),
        }
    }

    pub const fn from_flags(flags: TriggerFlags) -> Self {
        match (
            flags.contains(TriggerFlags::FALLING),
            flags.contains(TriggerFlags::RISING),
        ) {
            (false, false) => Trigger::None,
            (true, false) => Trigger::Falling,
            (false, true) => Trigger::Rising,
            (true, true) => Trigger::Both,
        }
    }

    /// Decode the contents of an `edge` node.
    ///
    /// The kernel terminates the name with a newline, so the contents only have to start
    /// with one of the canonical names.
    pub fn decode(text: &[u8]) -> Result<Self, UnrecognizedTrigger> {
        Self::ALL
            .into_iter()
            .find(|trigger| text.starts_with_str(trigger.name()))
            .ok_or_else(|| UnrecognizedTrigger(text.to_str_lossy().into_owned()))
    }
}

impl std::fmt::Display for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Trigger {
    type Err = UnrecognizedTrigger;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s.as_bytes())
    }
}

impl From<TriggerFlags> for Trigger {
    #[inline(always)]
    fn from(flags: TriggerFlags) -> Self {
        Self::from_flags(flags)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized trigger {0:?}")]
pub struct UnrecognizedTrigger(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_and_decode_are_inverse() {
        for trigger in Trigger::ALL {
            assert_eq!(Trigger::decode(trigger.name().as_bytes()), Ok(trigger));
            assert_eq!(trigger.to_string().parse::<Trigger>(), Ok(trigger));
        }
    }

    #[test]
    fn decode_accepts_kernel_newline() {
        assert_eq!(Trigger::decode(b"rising\n"), Ok(Trigger::Rising));
        assert_eq!(Trigger::decode(b"both\n\0\0"), Ok(Trigger::Both));
    }

    #[test]
    fn decode_rejects_unknown_text() {
        let texts: [&[u8]; 6] = [b"", b"\n", b"rise", b"BOTH", b" none", b"edge"];
        for text in texts {
            let err = Trigger::decode(text).unwrap_err();
            assert_eq!(err.0, text.to_str_lossy());
        }
    }

    #[test]
    fn flags_are_total() {
        for trigger in Trigger::ALL {
            assert_eq!(Trigger::from_flags(trigger.flags()), trigger);
        }
        assert_eq!(Trigger::from(TriggerFlags::all()), Trigger::Both);
        assert_eq!(Trigger::from(TriggerFlags::empty()), Trigger::None);
    }
}
