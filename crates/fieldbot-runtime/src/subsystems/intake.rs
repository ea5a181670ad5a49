use fieldbot_hal::io::{IntakeInputs, IntakeIo};
use fieldbot_types::{Pose2d, Pose3d, TelemetryValue, Translation2d};

use crate::recorder::TelemetrySink;

/// Telemetry key for the held-note marker.
pub const NOTE_IN_INTAKE_KEY: &str = "Intake/NoteInIntake";

/// Where a held note sits relative to the robot centre.
const HELD_NOTE_OFFSET: Translation2d = Translation2d { x: 0.1, y: 0.0 };
const HELD_NOTE_HEIGHT_M: f64 = 0.25;

/// Roller intake with a note sensor.
pub struct Intake {
    io: Box<dyn IntakeIo>,
    inputs: IntakeInputs,
}

impl Intake {
    pub fn new(io: Box<dyn IntakeIo>) -> Self {
        Self {
            io,
            inputs: IntakeInputs::default(),
        }
    }

    pub fn periodic(&mut self) {
        self.io.update_inputs(&mut self.inputs);
    }

    pub fn run(&mut self, running: bool) {
        self.io.set_running(running);
    }

    /// Feed the held note into the flywheel.
    pub fn launch(&mut self) {
        self.io.launch_note();
    }

    pub fn stop(&mut self) {
        self.io.set_running(false);
    }

    /// As of the last `periodic`.
    pub fn note_detected(&self) -> bool {
        self.inputs.note_detected
    }

    pub fn applied_volts(&self) -> f64 {
        self.inputs.applied_volts
    }

    /// Publish the held note at `robot`, or an empty list when none is held.
    pub fn visualize_note(&self, robot: Pose2d, sink: &mut dyn TelemetrySink) {
        let poses = if self.inputs.note_detected {
            let at = robot.transform_point(HELD_NOTE_OFFSET);
            vec![Pose3d {
                x: at.x,
                y: at.y,
                z: HELD_NOTE_HEIGHT_M,
                yaw: robot.rotation.radians(),
                ..Default::default()
            }]
        } else {
            Vec::new()
        };
        sink.record(NOTE_IN_INTAKE_KEY, TelemetryValue::Poses3d(poses));
    }
}
