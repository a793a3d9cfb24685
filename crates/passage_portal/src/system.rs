use std::collections::VecDeque;

use passage_shared::pose::Pose;
use tracing::{info, warn};

use crate::crossing::{Collider, CrossingState, EnterOutcome, IgnoreReason, TeleportPlan, TeleportRecord};
use crate::gate::{self, DestinationSample, GateEvent, PlayerSample};
use crate::player::PlayerBody;
use crate::portal::{Portal, PortalId, PortalSettings};
use crate::render_target::{FrameBufferProvider, RenderTargets};

/// Messages one portal sends to another during a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortalNotice {
    /// The player is about to be written into this portal's volume.
    IncomingTeleport(PortalId),
}

/// A portal view the host should render this frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewRequest<H> {
    /// Portal whose view camera renders.
    pub source: PortalId,
    /// Portal whose surface displays the result.
    pub shown_on: PortalId,
    pub pose: Pose,
    pub target: H,
}

#[derive(Debug)]
pub struct FrameReport<H> {
    pub gate_events: Vec<GateEvent>,
    pub views: Vec<ViewRequest<H>>,
    pub teleport: Option<TeleportRecord>,
}

impl<H> Default for FrameReport<H> {
    fn default() -> Self {
        Self {
            gate_events: Vec::new(),
            views: Vec::new(),
            teleport: None,
        }
    }
}

/// Registry of linked portals plus the single player they act on.
pub struct PortalSystem<P: PlayerBody, F: FrameBufferProvider> {
    portals: Vec<Portal>,
    player: Option<P>,
    targets: RenderTargets<F>,
    /// Notices posted during the crossing pass, delivered before any player
    /// transform write.
    notices: VecDeque<PortalNotice>,
}

impl<P: PlayerBody, F: FrameBufferProvider> PortalSystem<P, F> {
    pub fn new(provider: F, output_width: u32, output_height: u32, render_scale: f32) -> Self {
        Self {
            portals: Vec::new(),
            player: None,
            targets: RenderTargets::new(provider, output_width, output_height, render_scale),
            notices: VecDeque::new(),
        }
    }

    pub fn add_portal(&mut self, settings: PortalSettings) -> PortalId {
        let id = PortalId(self.portals.len() as u32);
        self.portals.push(Portal::new(id, settings));
        id
    }

    pub fn portal(&self, id: PortalId) -> Option<&Portal> {
        self.portals.get(id.index())
    }

    pub fn portals(&self) -> &[Portal] {
        &self.portals
    }

    pub fn find(&self, name: &str) -> Option<PortalId> {
        self.portals
            .iter()
            .find(|portal| portal.name() == name)
            .map(Portal::id)
    }

    /// Points `a` and `b` at each other.
    pub fn link(&mut self, a: PortalId, b: PortalId) -> bool {
        self.set_destination(a, Some(b)) && self.set_destination(b, Some(a))
    }

    /// Reassigns or clears a destination. Unknown ids leave the portal unlinked.
    pub fn set_destination(&mut self, id: PortalId, destination: Option<PortalId>) -> bool {
        let known = destination.map_or(true, |dest| dest.index() < self.portals.len());
        let Some(portal) = self.portals.get_mut(id.index()) else {
            warn!("Cannot link unknown {id}");
            return false;
        };
        if known {
            portal.destination = destination;
        } else {
            warn!("{id} cannot link to unknown {destination:?}; leaving it unlinked");
            portal.destination = None;
        }
        known
    }

    pub fn bind_player(&mut self, player: P) -> Option<P> {
        self.player.replace(player)
    }

    /// Binds an explicitly configured player, or else the result of a single
    /// `lookup`. Returns whether a player ended up bound.
    pub fn resolve_player(&mut self, explicit: Option<P>, lookup: impl FnOnce() -> Option<P>) -> bool {
        match explicit.or_else(lookup) {
            Some(player) => {
                self.player = Some(player);
                true
            }
            None => {
                warn!("No player bound; portals stay inactive until one is");
                false
            }
        }
    }

    pub fn unbind_player(&mut self) -> Option<P> {
        self.player.take()
    }

    pub fn player(&self) -> Option<&P> {
        self.player.as_ref()
    }

    pub fn player_mut(&mut self) -> Option<&mut P> {
        self.player.as_mut()
    }

    pub fn setup_render_targets(&mut self) {
        self.targets.setup(self.portals.len());
    }

    pub fn resize_output(&mut self, width: u32, height: u32) -> bool {
        self.targets.resize(width, height)
    }

    pub fn render_targets(&self) -> &RenderTargets<F> {
        &self.targets
    }

    pub fn crossing_state(&self, id: PortalId) -> Option<CrossingState> {
        self.portal(id).map(Portal::crossing_state)
    }

    pub fn overlap_begin(&mut self, id: PortalId, collider: Collider) -> EnterOutcome {
        let has_destination = self.live_destination(id).is_some();
        let player_position = self.player.as_ref().map(PlayerBody::position);
        let eye = self
            .player
            .as_ref()
            .map(PlayerBody::eye_position)
            .unwrap_or_default();
        let Some(portal) = self.portals.get_mut(id.index()) else {
            return EnterOutcome::Ignored(IgnoreReason::UnknownPortal);
        };
        let in_room = portal.is_in_room(player_position);
        portal.on_enter(collider, has_destination, in_room, eye)
    }

    pub fn overlap_end(&mut self, id: PortalId, collider: Collider) -> bool {
        self.portals
            .get_mut(id.index())
            .is_some_and(|portal| portal.on_exit(collider))
    }

    /// Runs the render gate for every portal, then the crossing check.
    /// At most one teleport happens per frame: the crossing posts a notice to
    /// its destination, notices are delivered, then the player is moved.
    pub fn frame(&mut self, now_s: f32) -> FrameReport<F::Handle> {
        let mut report = FrameReport::default();
        let player = self.player.as_ref().map(|player| PlayerSample {
            position: player.position(),
            forward: player.forward(),
        });
        let player_position = player.map(|sample| sample.position);
        let in_room: Vec<bool> = self
            .portals
            .iter()
            .map(|portal| portal.is_in_room(player_position))
            .collect();

        for index in 0..self.portals.len() {
            let id = PortalId(index as u32);
            let destination = self.live_destination(id).map(|dest| DestinationSample {
                id: dest,
                pose: *self.portals[dest.index()].pose(),
                in_room: in_room[dest.index()],
            });

            let portal = &mut self.portals[index];
            gate::update_portal(portal, destination, player, &mut report.gate_events);

            let Some(destination) = destination else {
                continue;
            };
            if !portal.camera.active {
                continue;
            }
            if let Some(target) = self.targets.target(id) {
                report.views.push(ViewRequest {
                    source: id,
                    shown_on: destination.id,
                    pose: portal.camera.pose,
                    target,
                });
            }
        }

        if let Some(plan) = self.find_crossing(now_s) {
            self.post_notice(PortalNotice::IncomingTeleport(plan.to));
            self.deliver_notices();
            report.teleport = self.apply_teleport(&plan, now_s);
        }
        report
    }

    /// First portal, in id order, whose crossing fires this frame.
    fn find_crossing(&mut self, now_s: f32) -> Option<TeleportPlan> {
        let player = self.player.as_ref()?;
        let position = player.position();
        let eye = player.eye_position();

        for index in 0..self.portals.len() {
            let id = PortalId(index as u32);
            let destination = self
                .live_destination(id)
                .map(|dest| (dest, *self.portals[dest.index()].pose()));
            let plan = self.portals[index].check_crossing(
                destination.as_ref().map(|(dest, pose)| (*dest, pose)),
                position,
                eye,
                now_s,
            );
            if plan.is_some() {
                return plan;
            }
        }
        None
    }

    fn post_notice(&mut self, notice: PortalNotice) {
        self.notices.push_back(notice);
    }

    fn deliver_notices(&mut self) {
        while let Some(notice) = self.notices.pop_front() {
            match notice {
                PortalNotice::IncomingTeleport(id) => match self.portals.get_mut(id.index()) {
                    Some(portal) => portal.pending_teleport = true,
                    None => warn!("Dropping teleport notice for unknown {id}"),
                },
            }
        }
    }

    fn apply_teleport(&mut self, plan: &TeleportPlan, now_s: f32) -> Option<TeleportRecord> {
        let player = self.player.as_mut()?;
        let record = plan.apply(player, now_s);
        info!(
            "Teleported player {} -> {} at {:.3}s: {:?} -> {:?}, yaw {:+.1} deg",
            record.from,
            record.to,
            now_s,
            record.from_position,
            record.to_position,
            record.yaw_delta.to_degrees()
        );
        Some(record)
    }

    fn live_destination(&self, id: PortalId) -> Option<PortalId> {
        self.portals
            .get(id.index())?
            .destination
            .filter(|dest| dest.index() < self.portals.len())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::f32::consts::PI;

    use glam::Vec3;
    use passage_shared::pose::Pose;

    use super::{PortalNotice, PortalSystem};
    use crate::crossing::{Collider, CrossingState, EnterOutcome, IgnoreReason};
    use crate::gate::GateEvent;
    use crate::player::PlayerRig;
    use crate::portal::{PortalId, PortalSettings};
    use crate::render_target::HeadlessFrameBuffers;

    type TestSystem = PortalSystem<PlayerRig, HeadlessFrameBuffers>;

    /// A at the origin with its front towards -Z, B 100 units along +X facing +Z.
    fn linked_pair(inverted: bool) -> (TestSystem, PortalId, PortalId) {
        let mut system = PortalSystem::new(HeadlessFrameBuffers::new(), 1280, 720, 1.0);
        let a = system.add_portal(
            PortalSettings::new("a", Pose::standing(Vec3::ZERO, PI)).inverted(inverted),
        );
        let b = system.add_portal(
            PortalSettings::new("b", Pose::standing(Vec3::new(100.0, 0.0, 0.0), 0.0))
                .inverted(inverted),
        );
        assert!(system.link(a, b));
        system.setup_render_targets();
        system.bind_player(PlayerRig::new(Vec3::new(0.0, 0.0, -2.0), 0.0, 1.6));
        (system, a, b)
    }

    fn place_player(system: &mut TestSystem, position: Vec3) {
        system.player_mut().expect("player bound").position = position;
    }

    #[test]
    fn walking_through_a_teleports_once_and_primes_b() {
        let (mut system, a, b) = linked_pair(false);

        let report = system.frame(0.0);
        assert!(report.teleport.is_none());
        assert!(report.gate_events.contains(&GateEvent::SurfaceShown(a)));
        assert!(report.gate_events.contains(&GateEvent::CameraActivated(b)));
        assert_eq!(report.views.len(), 1);
        assert_eq!(report.views[0].source, b);
        assert_eq!(report.views[0].shown_on, a);
        assert_eq!(
            Some(report.views[0].target),
            system.render_targets().target(b)
        );

        assert_eq!(
            system.overlap_begin(a, Collider::Player),
            EnterOutcome::Accepted { from_front: true }
        );
        assert_eq!(system.crossing_state(a), Some(CrossingState::InsideFromFront));

        place_player(&mut system, Vec3::new(0.0, 0.0, -1.5));
        assert!(system.frame(0.05).teleport.is_none());

        place_player(&mut system, Vec3::new(0.0, 0.0, 1.0));
        let record = system.frame(0.1).teleport.expect("crossing should teleport");
        assert_eq!((record.from, record.to), (a, b));

        let player = system.player().expect("player bound");
        assert!((player.position - Vec3::new(100.0, 0.0, 1.0)).length() < 1.0e-4);
        assert!((player.camera_yaw.abs() - PI).abs() < 1.0e-4);

        let b_portal = system.portal(b).expect("portal b");
        assert!(b_portal.is_pending_teleport());
        assert_eq!(
            system.overlap_begin(b, Collider::Player),
            EnterOutcome::Ignored(IgnoreReason::PendingTeleport)
        );

        // Still inside A and past its plane, but the cooldown holds.
        assert!(system.frame(0.2).teleport.is_none());

        assert!(system.overlap_end(b, Collider::Player));
        assert!(!system.portal(b).expect("portal b").is_pending_teleport());
    }

    #[test]
    fn destination_is_pending_before_the_player_moves() {
        let (mut system, a, b) = linked_pair(false);
        system.overlap_begin(a, Collider::Player);
        place_player(&mut system, Vec3::new(0.0, 0.0, 1.0));

        let plan = system.find_crossing(0.1).expect("crossing fires");
        assert_eq!(plan.to, b);
        assert!(!system.portal(b).expect("portal b").is_pending_teleport());

        system.post_notice(PortalNotice::IncomingTeleport(plan.to));
        assert!(!system.portal(b).expect("portal b").is_pending_teleport());
        system.deliver_notices();
        assert!(system.portal(b).expect("portal b").is_pending_teleport());
        let player = system.player().expect("player bound");
        assert!((player.position - Vec3::new(0.0, 0.0, 1.0)).length() < 1.0e-6);

        let record = system.apply_teleport(&plan, 0.1).expect("player moved");
        assert_eq!(record.to, b);
        assert!(system.notices.is_empty());
    }

    #[test]
    fn notice_for_an_unknown_portal_is_dropped() {
        let (mut system, a, b) = linked_pair(false);
        system.post_notice(PortalNotice::IncomingTeleport(PortalId(42)));
        system.deliver_notices();
        assert!(system.notices.is_empty());
        assert!(!system.portal(a).expect("portal a").is_pending_teleport());
        assert!(!system.portal(b).expect("portal b").is_pending_teleport());
    }

    #[test]
    fn second_crossing_inside_cooldown_is_dropped() {
        let (mut system, a, _b) = linked_pair(false);
        system.overlap_begin(a, Collider::Player);
        place_player(&mut system, Vec3::new(0.0, 0.0, 1.0));
        assert!(system.frame(0.1).teleport.is_some());

        // Come straight back to A's front and cross again.
        system.overlap_end(a, Collider::Player);
        place_player(&mut system, Vec3::new(0.0, 0.0, -2.0));
        assert_eq!(
            system.overlap_begin(a, Collider::Player),
            EnterOutcome::Accepted { from_front: true }
        );
        place_player(&mut system, Vec3::new(0.0, 0.0, 1.0));

        assert!(system.frame(0.3).teleport.is_none());
        assert!(system.frame(0.55).teleport.is_none());
        let player = system.player().expect("player bound");
        assert!((player.position - Vec3::new(0.0, 0.0, 1.0)).length() < 1.0e-4);
    }

    #[test]
    fn first_crossing_fires_even_with_a_long_cooldown() {
        let mut system: TestSystem = PortalSystem::new(HeadlessFrameBuffers::new(), 1280, 720, 1.0);
        let mut slow = PortalSettings::new("a", Pose::standing(Vec3::ZERO, PI));
        slow.cooldown_seconds = 5000.0;
        let a = system.add_portal(slow);
        let b = system.add_portal(PortalSettings::new(
            "b",
            Pose::standing(Vec3::new(100.0, 0.0, 0.0), 0.0),
        ));
        assert!(system.link(a, b));
        system.bind_player(PlayerRig::new(Vec3::new(0.0, 0.0, -2.0), 0.0, 1.6));

        system.overlap_begin(a, Collider::Player);
        place_player(&mut system, Vec3::new(0.0, 0.0, 1.0));
        let record = system.frame(0.0).teleport.expect("first crossing teleports");
        assert_eq!((record.from, record.to), (a, b));
    }

    #[test]
    fn round_trip_returns_to_the_original_offset() {
        let (mut system, a, b) = linked_pair(false);
        system.overlap_begin(a, Collider::Player);
        place_player(&mut system, Vec3::new(0.0, 0.0, 0.5));
        assert!(system.frame(0.0).teleport.is_some());
        system.overlap_end(a, Collider::Player);
        system.overlap_end(b, Collider::Player);

        place_player(&mut system, Vec3::new(100.0, 0.0, 3.0));
        assert_eq!(
            system.overlap_begin(b, Collider::Player),
            EnterOutcome::Accepted { from_front: true }
        );
        place_player(&mut system, Vec3::new(100.0, 0.0, 0.5));
        let back = system.frame(0.7).teleport.expect("crossing back through b");
        assert_eq!((back.from, back.to), (b, a));

        let player = system.player().expect("player bound");
        assert!((player.position - Vec3::new(0.0, 0.0, 0.5)).length() < 1.0e-4);
        assert!(player.camera_yaw.abs() < 1.0e-4);
        assert!(system.portal(a).expect("portal a").is_pending_teleport());
    }

    #[test]
    fn unlinked_portal_never_lights_up_or_accepts_entry() {
        let (mut system, _a, _b) = linked_pair(false);
        let lonely = system.add_portal(PortalSettings::new("lonely", Pose::standing(Vec3::ZERO, 0.0)));
        system.setup_render_targets();

        for now in [0.0, 0.1, 0.2] {
            let report = system.frame(now);
            assert!(report.views.iter().all(|view| view.source != lonely));
            let portal = system.portal(lonely).expect("lonely portal");
            assert!(!portal.camera().active);
            assert!(!portal.is_surface_visible());
        }
        assert_eq!(
            system.overlap_begin(lonely, Collider::Player),
            EnterOutcome::Ignored(IgnoreReason::NoDestination)
        );
    }

    #[test]
    fn destination_cleared_while_inside_cancels_the_crossing() {
        let (mut system, a, _b) = linked_pair(false);
        system.frame(0.0);
        system.overlap_begin(a, Collider::Player);
        assert!(system.set_destination(a, None));

        place_player(&mut system, Vec3::new(0.0, 0.0, 1.0));
        let report = system.frame(0.1);
        assert!(report.teleport.is_none());
        assert!(report.gate_events.contains(&GateEvent::SurfaceHidden(a)));
    }

    #[test]
    fn linking_to_an_unknown_portal_leaves_it_unlinked() {
        let (mut system, a, _b) = linked_pair(false);
        assert!(!system.set_destination(a, Some(PortalId(42))));
        assert_eq!(system.portal(a).expect("portal a").destination(), None);
    }

    #[test]
    fn without_a_player_everything_stays_inert() {
        let (mut system, a, _b) = linked_pair(false);
        let rig = system.unbind_player().expect("was bound");

        let report = system.frame(0.0);
        assert!(report.views.is_empty());
        assert!(report.teleport.is_none());
        assert_eq!(
            system.overlap_begin(a, Collider::Player),
            EnterOutcome::Ignored(IgnoreReason::OutOfRoom)
        );

        system.bind_player(rig);
        assert_eq!(system.frame(0.1).views.len(), 1);
    }

    #[test]
    fn player_lookup_only_runs_without_an_explicit_player() {
        let (mut system, _a, _b) = linked_pair(false);
        let lookups = Cell::new(0);

        let explicit = PlayerRig::new(Vec3::new(1.0, 0.0, 0.0), 0.0, 1.6);
        assert!(system.resolve_player(Some(explicit), || {
            lookups.set(lookups.get() + 1);
            None
        }));
        assert_eq!(lookups.get(), 0);
        assert_eq!(system.player().expect("bound").position, Vec3::new(1.0, 0.0, 0.0));

        assert!(system.resolve_player(None, || {
            lookups.set(lookups.get() + 1);
            Some(PlayerRig::default())
        }));
        assert_eq!(lookups.get(), 1);

        assert!(!system.resolve_player(None, || None));
    }

    #[test]
    fn resize_swaps_the_targets_handed_out_in_view_requests() {
        let (mut system, _a, b) = linked_pair(false);
        let before = system.render_targets().target(b).expect("target for b");

        assert!(system.resize_output(1920, 1080));
        let after = system.render_targets().target(b).expect("target for b");
        assert_ne!(before, after);
        assert_eq!(system.render_targets().provider().live_count(), 2);
        assert_eq!(system.frame(0.0).views[0].target, after);
    }

    #[test]
    fn far_from_both_portals_nothing_renders() {
        let (mut system, a, b) = linked_pair(false);
        place_player(&mut system, Vec3::new(50.0, 0.0, 500.0));
        let report = system.frame(0.0);
        assert!(report.views.is_empty());
        assert!(!system.portal(a).expect("a").is_surface_visible());
        assert!(!system.portal(b).expect("b").is_surface_visible());
    }
}
