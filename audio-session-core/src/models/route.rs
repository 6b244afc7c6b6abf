/// Explicit routing override, bypassing the category's default routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteOverride {
    /// Force output to the loudspeaker.
    Playback,
    /// Force input to the built-in microphone with output on the loudspeaker.
    Recording,
}

/// Which device lists a platform route-change notification affects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteChange {
    Inputs,
    Outputs,
    Both,
}

impl RouteChange {
    pub fn affects_inputs(&self) -> bool {
        matches!(self, Self::Inputs | Self::Both)
    }

    pub fn affects_outputs(&self) -> bool {
        matches!(self, Self::Outputs | Self::Both)
    }
}
