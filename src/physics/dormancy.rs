//! Dormancy: puts settled bodies to sleep and wakes them on disturbance.
//!
//! Each dynamic body keeps Welford running statistics of its position and
//! angle. A body whose combined variance stays under the limit for longer
//! than the idle time limit falls asleep; a body moving faster than the
//! speed limit, or receiving an impulse, wakes up with fresh statistics.

use glam::DVec2;
use tracing::trace;

use crate::ecs::components::physics::{Collider, RigidBody, SleepInfo, SleepState};
use crate::ecs::components::transform::BodyState;

/// Scene-wide dormancy defaults, used where a body leaves a limit unset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SleepConfig {
    pub enabled: bool,
    /// Speed (linear plus radius-scaled angular) at or above which a body wakes.
    pub speed_limit: f64,
    /// Combined position and angle variance at or below which a body idles.
    pub variance_limit: f64,
    /// Idle seconds before a body falls asleep.
    pub time_limit: f64,
}

impl Default for SleepConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            speed_limit: 0.05,
            variance_limit: 0.02,
            time_limit: 0.5,
        }
    }
}

impl SleepConfig {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }
}

/// Per-body limit, with zero meaning "use the scene default".
#[inline]
fn limit_or(value: f64, fallback: f64) -> f64 {
    if value == 0.0 {
        fallback
    } else {
        value
    }
}

impl SleepInfo {
    /// Push one sample into the running statistics and return the
    /// population variance of position and angle.
    pub fn push_sample(&mut self, position: DVec2, angle: f64) -> (DVec2, f64) {
        self.samples += 1;
        let k = self.samples as f64;

        let delta = position - self.mean_position;
        self.mean_position += delta / k;
        self.m2_position += delta * (position - self.mean_position);

        let delta = angle - self.mean_angle;
        self.mean_angle += delta / k;
        self.m2_angle += delta * (angle - self.mean_angle);

        (self.m2_position / k, self.m2_angle / k)
    }
}

/// Run one dormancy step for a single body.
///
/// `radius` scales angular quantities into linear ones.
pub fn sleep_check(
    sleep: &mut SleepInfo,
    state: &mut BodyState,
    radius: f64,
    dt: f64,
    config: &SleepConfig,
) {
    let speed = state.velocity.length() + (radius * state.angular_velocity).abs();
    if speed >= limit_or(sleep.speed_limit, config.speed_limit) {
        sleep.wake();
        return;
    }

    let (position_variance, angle_variance) = sleep.push_sample(state.position, state.angle);
    let metric = position_variance.length() + (radius * angle_variance).abs();

    if metric <= limit_or(sleep.variance_limit, config.variance_limit) {
        sleep.idle_time += dt;
        if sleep.idle_time > limit_or(sleep.time_limit, config.time_limit)
            && sleep.state == SleepState::Awake
        {
            sleep.state = SleepState::Sleeping;
            state.clear_motion();
        }
    } else if sleep.is_sleeping() {
        sleep.wake();
    } else {
        sleep.reset_statistics();
    }
}

/// Update sleep states for all dynamic bodies.
pub fn update_sleep_states(world: &mut hecs::World, dt: f64, config: &SleepConfig) {
    if !config.enabled {
        return;
    }
    for (entity, (rb, collider, state, sleep)) in
        world.query_mut::<(&RigidBody, &Collider, &mut BodyState, &mut SleepInfo)>()
    {
        if !rb.is_dynamic() {
            continue;
        }
        let was_sleeping = sleep.is_sleeping();
        sleep_check(sleep, state, collider.shape.bounding_radius(), dt, config);
        if was_sleeping != sleep.is_sleeping() {
            trace!(?entity, sleeping = sleep.is_sleeping(), "sleep state changed");
        }
    }
}

/// Wake up a specific entity's rigid body and reset its statistics.
pub fn wake_body(world: &mut hecs::World, entity: hecs::Entity) {
    if let Ok(mut sleep) = world.get::<&mut SleepInfo>(entity) {
        sleep.wake();
    }
}
