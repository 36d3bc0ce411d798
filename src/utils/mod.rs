#[macro_use]
pub mod math;

/// The alliance the robot is playing for.
///
/// Field geometry is authored from the blue driver station, so `Red` is the
/// only alliance that gets flipped. `None` is used before the host knows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AllianceColor {
    #[default]
    None,
    Red,
    Blue,
}

impl AllianceColor {
    /// The alliance on the other side of the field. An unknown alliance plays
    /// against red, matching the blue-authored defaults.
    pub fn opponent(self) -> Self {
        match self {
            AllianceColor::Red => AllianceColor::Blue,
            AllianceColor::Blue | AllianceColor::None => AllianceColor::Red,
        }
    }
}
