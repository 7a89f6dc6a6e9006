/// Discrete events produced by a simulation step.
///
/// The core never renders or plays sound; it reports what happened and
/// the host decides what to do with it. Most variants correspond to a
/// sound-effect cue, the last three to level outcomes.

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum GameEvent {
    /// Hard contact with a floor or wall.
    Land,
    /// Walk cycle: weight came down.
    Step,
    /// Walk cycle: weight came up.
    StepLift,
    Climb,
    /// Tether pickup collected at this cell.
    ItemPickup { col: i32, row: i32 },
    RopeLaunch,
    RopeAnchor,
    /// Cable tension exceeded the maximum length and the rope broke.
    RopeSnapped,
    /// A tumbling block started falling.
    BlockFall,
    /// A tumbling block settled into this cell.
    BlockLand { col: i32, row: i32 },
    DoorEntered,
    LevelComplete,
    PlayerLost,
}
