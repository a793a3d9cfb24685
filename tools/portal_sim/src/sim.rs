use glam::Vec3;
use passage_core::clock::FrameClock;
use passage_portal::config::{ScriptStep, SceneConfig};
use passage_portal::crossing::{Collider, TeleportRecord};
use passage_portal::error::SceneError;
use passage_portal::player::PlayerRig;
use passage_portal::portal::{Portal, PortalId};
use passage_portal::render_target::HeadlessFrameBuffers;
use passage_portal::system::PortalSystem;
use passage_shared::physics::{OverlapTracker, OverlapTransition, AABB};
use tracing::{debug, info};

/// Drives a scene headlessly: scripted movement, trigger overlaps, then the
/// portal frame.
pub struct Simulation {
    system: PortalSystem<PlayerRig, HeadlessFrameBuffers>,
    script: Vec<ScriptStep>,
    overlaps: OverlapTracker,
    clock: FrameClock,
    teleports: Vec<TeleportRecord>,
    views_rendered: u64,
}

#[derive(Debug, Clone, Copy)]
pub struct Summary {
    pub frames: u64,
    pub elapsed_s: f32,
    pub teleports: usize,
    pub views_rendered: u64,
    pub final_position: Vec3,
}

impl Simulation {
    pub fn new(scene: &SceneConfig) -> Result<Self, SceneError> {
        let system = scene.build_system(HeadlessFrameBuffers::new())?;
        let overlaps = OverlapTracker::new(system.portals().len());
        Ok(Self {
            system,
            script: scene.script.clone(),
            overlaps,
            clock: FrameClock::new(),
            teleports: Vec::new(),
            views_rendered: 0,
        })
    }

    pub fn step(&mut self, dt_s: f32) {
        let now_s = self.clock.advance(dt_s);
        let dt_s = if dt_s > 0.0 { dt_s } else { 0.0 };

        if let Some(step) = active_step(&self.script, now_s) {
            let walk = Vec3::from_array(step.walk);
            let turn = step.turn_degrees_per_second.to_radians() * dt_s;
            if let Some(rig) = self.system.player_mut() {
                rig.turn(turn);
                rig.sync_body_to_camera();
                rig.walk(walk, dt_s);
            }
        }

        self.dispatch_overlaps();

        let report = self.system.frame(now_s);
        for event in &report.gate_events {
            debug!("frame {}: {event:?}", self.clock.frame());
        }
        self.views_rendered += report.views.len() as u64;
        if let Some(record) = report.teleport {
            info!(
                "frame {}: crossed {} -> {}",
                self.clock.frame(),
                self.portal_name(record.from),
                self.portal_name(record.to)
            );
            self.teleports.push(record);
        }
    }

    pub fn teleports(&self) -> &[TeleportRecord] {
        &self.teleports
    }

    pub fn summary(&self) -> Summary {
        Summary {
            frames: self.clock.frame(),
            elapsed_s: self.clock.elapsed_s(),
            teleports: self.teleports.len(),
            views_rendered: self.views_rendered,
            final_position: self
                .system
                .player()
                .map_or(Vec3::ZERO, |rig| rig.position),
        }
    }

    fn dispatch_overlaps(&mut self) {
        let Some(body) = self.system.player().map(PlayerRig::bounds) else {
            return;
        };
        let volumes: Vec<AABB> = self.system.portals().iter().map(Portal::trigger_bounds).collect();
        for (index, transition) in self.overlaps.step(&body, &volumes) {
            let id = PortalId(index as u32);
            match transition {
                OverlapTransition::Began => {
                    let outcome = self.system.overlap_begin(id, Collider::Player);
                    debug!("{} overlap began: {outcome:?}", self.portal_name(id));
                }
                OverlapTransition::Ended => {
                    self.system.overlap_end(id, Collider::Player);
                }
            }
        }
    }

    fn portal_name(&self, id: PortalId) -> &str {
        self.system.portal(id).map_or("?", Portal::name)
    }
}

/// The last script step whose start time has been reached.
fn active_step(script: &[ScriptStep], now_s: f32) -> Option<&ScriptStep> {
    script.iter().rev().find(|step| step.at <= now_s)
}
