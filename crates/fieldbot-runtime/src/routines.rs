//! Autonomous chooser contents.

use fieldbot_kernel::RoutineCatalog;
use fieldbot_kernel::catalog::sweep_name;
use fieldbot_types::{ConfigError, SubsystemKind};

use crate::actions::{self, MechanismAccess, boxed};
use crate::bindings::BindingConfig;
use crate::context::RobotContext;

pub const AUTO_CHOOSER_TITLE: &str = "Auto Choices";
pub const RUN_FLYWHEEL: &str = "Run Flywheel";
pub const SHOOT_PRELOAD: &str = "Shoot Preload";

const RUN_FLYWHEEL_TIMEOUT_S: f64 = 5.0;

/// Build the chooser: "None", the named routines, then four sweeps each for
/// the drivetrain and the flywheel.
///
/// # Errors
///
/// [`ConfigError::DuplicateRoutine`] if two entries share a name.
pub fn build_catalog(config: &BindingConfig) -> Result<RoutineCatalog<RobotContext>, ConfigError> {
    let mut catalog = RoutineCatalog::new(AUTO_CHOOSER_TITLE);

    catalog.register(RUN_FLYWHEEL, || {
        boxed(actions::flywheel_tunable(RUN_FLYWHEEL).with_timeout(RUN_FLYWHEEL_TIMEOUT_S))
    })?;

    let shoot_rpm = config.flywheel_fixed_rpm;
    catalog.register(SHOOT_PRELOAD, move || boxed(actions::shoot_preload(shoot_rpm)))?;

    register_sweeps(&mut catalog, SubsystemKind::Drive, actions::drive_mechanism)?;
    register_sweeps(&mut catalog, SubsystemKind::Flywheel, actions::flywheel_mechanism)?;

    Ok(catalog)
}

fn register_sweeps(
    catalog: &mut RoutineCatalog<RobotContext>,
    subsystem: SubsystemKind,
    mechanism: MechanismAccess,
) -> Result<(), ConfigError> {
    catalog.register_characterization(subsystem.name(), move |kind, direction| {
        let name = sweep_name(subsystem.name(), kind, direction);
        Box::new(move || {
            boxed(actions::characterization(
                name.clone(),
                subsystem,
                mechanism,
                kind,
                direction,
            ))
        })
    })
}
