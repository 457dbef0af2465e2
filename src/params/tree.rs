//! The flight controller's parameter menus.

use super::{Action, Menu, Node};

pub const MAIN_MENU: Menu = Menu {
    caption: "Main Menu",
    nodes: MAIN,
};

const MAIN: &[Node] = &[
    Node::action("Save params to EEPROM", Action::Save),
    Node::action("Reset params to default values", Action::Reset),
    Node::action("List all params", Action::List),
    Node::submenu("Controller Params", CONTROLLER),
    Node::submenu("Fail Safe Params", FAIL_SAFE),
    Node::submenu("Filter Params", FILTER),
    Node::submenu("Magnetometer Params", MAGNETOMETER),
    Node::selection("Debug Output", "debug_output", DEBUG_OUTPUTS, 0).volatile(),
    Node::action("Exit", Action::Exit),
];

/// Serial debug printers the main loop can run, one at a time.
pub const DEBUG_OUTPUTS: &[&str] = &[
    "None",
    "Radio Data",
    "Desired State",
    "Gyro Data",
    "Accel Data",
    "Mag Data",
    "Roll Pitch Yaw",
    "PID Output",
    "Motor Commands",
    "Servo Commands",
    "Loop Rate",
];

const CONTROLLER: &[Node] = &[
    Node::float("Integrator Saturation Level", "i_limit", 25.0),
    Node::submenu("Roll", ROLL),
    Node::submenu("Pitch", PITCH),
    Node::submenu("Yaw", YAW),
];

const ROLL: &[Node] = &[
    Node::float("Max Angle", "maxRoll", 30.0),
    Node::float("P-gain Angle Mode", "Kp_roll_angle", 0.2),
    Node::float("I-gain Angle Mode", "Ki_roll_angle", 0.3),
    Node::float("D-gain Angle Mode", "Kd_roll_angle", 0.05),
    Node::float("Damping (Angle2)", "B_loop_roll", 0.9),
    Node::float("P-gain Rate Mode", "Kp_roll_rate", 0.15),
    Node::float("I-gain Rate Mode", "Ki_roll_rate", 0.2),
    Node::float("D-gain Rate Mode", "Kd_roll_rate", 0.0002),
];

const PITCH: &[Node] = &[
    Node::float("Max Angle", "maxPitch", 30.0),
    Node::float("P-gain Angle Mode", "Kp_pitch_angle", 0.2),
    Node::float("I-gain Angle Mode", "Ki_pitch_angle", 0.3),
    Node::float("D-gain Angle Mode", "Kd_pitch_angle", 0.05),
    Node::float("Damping (Angle2)", "B_loop_pitch", 0.9),
    Node::float("P-gain Rate Mode", "Kp_pitch_rate", 0.15),
    Node::float("I-gain Rate Mode", "Ki_pitch_rate", 0.2),
    Node::float("D-gain Rate Mode", "Kd_pitch_rate", 0.0002),
];

const YAW: &[Node] = &[
    Node::float("Max Rate", "maxYaw", 160.0),
    Node::float("P-gain", "Kp_yaw", 0.3),
    Node::float("I-gain", "Ki_yaw", 0.05),
    Node::float("D-gain", "Kd_yaw", 0.00015),
];

const FAIL_SAFE: &[Node] = &[
    Node::unsigned("Channel 1 (Throttle)", "channel_1_fs", 1000),
    Node::unsigned("Channel 2 (Aileron)", "channel_2_fs", 1500),
    Node::unsigned("Channel 3 (Elevator)", "channel_3_fs", 1500),
    Node::unsigned("Channel 4 (Rudder)", "channel_4_fs", 1500),
    Node::unsigned("Channel 5 (Gear)", "channel_5_fs", 2000),
    Node::unsigned("Channel 6 (Aux 1)", "channel_6_fs", 2000),
];

const FILTER: &[Node] = &[
    Node::float("Madgwick", "B_madgwick", 0.04),
    Node::float("Accelerometer Low Pass", "B_accel", 0.14),
    Node::float("Gyro Low Pass", "B_gyro", 0.1),
    Node::float("Magnetometer Low Pass", "B_mag", 1.0),
];

const MAGNETOMETER: &[Node] = &[
    Node::float("Error X", "MagErrorX", 0.0),
    Node::float("Error Y", "MagErrorY", 0.0),
    Node::float("Error Z", "MagErrorZ", 0.0),
    Node::float("Scale X", "MagScaleX", 1.0),
    Node::float("Scale Y", "MagScaleY", 1.0),
    Node::float("Scale Z", "MagScaleZ", 1.0),
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{ops, store::Layout, validate_tree};

    #[test]
    fn main_menu_is_well_formed() {
        validate_tree(MAIN_MENU.nodes).unwrap();
    }

    #[test]
    fn record_covers_every_tunable() {
        // 6 failsafe channels, 4 filters, 6 magnetometer, 1 + 8 + 8 + 4 controller.
        let layout = Layout::of(MAIN_MENU.nodes);
        assert_eq!(layout.leaves().len(), 37);
        assert_eq!(layout.record_len(), 37 * 4 + 8);
    }

    #[test]
    fn debug_output_is_volatile() {
        let leaf = ops::find_leaf(MAIN_MENU.nodes, "debug_output").unwrap();
        assert!(!leaf.is_persisted());
        assert_eq!(leaf.options()[0], "None");
    }
}
