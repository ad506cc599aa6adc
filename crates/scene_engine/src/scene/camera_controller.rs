//! Fly camera with animated focus
//!
//! W/S move along the view direction, A/D strafe, Q/E move along the
//! camera's up axis and shift speeds all of them up. Dragging with the
//! right button turns the camera, the wheel zooms and F frames the
//! current selection.

use crate::core::CameraConfig;
use crate::ecs::components::ComponentCamera;
use crate::ecs::{EntityKey, World};
use crate::foundation::math::{constants, look_rotation, Quat, Vec3};
use crate::input::{InputState, KeyCode, KeyState, MouseButton};
use crate::scene::Scene;

const FAST_MULTIPLIER: f32 = 3.0;
const PITCH_LIMIT: f32 = 89.0 * constants::DEG_TO_RAD;
const FALLBACK_FOV: f32 = 60.0 * constants::DEG_TO_RAD;

/// Focus animation state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FocusState {
    /// Free flight
    #[default]
    Unfocused,
    /// Moving toward a focus target
    Focusing,
    /// Resting at a focus target
    Focused,
}

#[derive(Debug, Clone, Copy)]
struct FocusPath {
    from_position: Vec3,
    from_rotation: Quat,
    to_position: Vec3,
    to_rotation: Quat,
    t: f32,
}

/// Drives one camera entity from input
#[derive(Debug, Clone)]
pub struct CameraController {
    camera: EntityKey,
    move_speed: f32,
    rotate_speed: f32,
    zoom_speed: f32,
    focus_duration: f32,
    yaw: f32,
    pitch: f32,
    state: FocusState,
    path: Option<FocusPath>,
}

impl CameraController {
    /// Create a controller for the camera on `camera`
    pub fn new(camera: EntityKey, config: &CameraConfig) -> Self {
        Self {
            camera,
            move_speed: config.move_speed,
            rotate_speed: config.rotate_speed,
            zoom_speed: config.zoom_speed,
            focus_duration: config.focus_duration,
            yaw: 0.0,
            pitch: 0.0,
            state: FocusState::Unfocused,
            path: None,
        }
    }

    /// Controlled camera entity
    pub fn camera(&self) -> EntityKey {
        self.camera
    }

    /// Current focus state
    pub fn state(&self) -> FocusState {
        self.state
    }

    /// Start animating toward a view that frames a sphere at `target`
    ///
    /// The camera keeps its viewing direction and backs off until the
    /// sphere fits the vertical field of view.
    pub fn setup_focus(&mut self, world: &World, target: Vec3, radius: f32) -> bool {
        let Some(entity) = world.get(self.camera) else {
            return false;
        };
        let fov = world
            .get_component_as::<ComponentCamera>(self.camera)
            .and_then(ComponentCamera::vertical_fov)
            .unwrap_or(FALLBACK_FOV);

        let transform = entity.transform();
        let distance = radius.max(f32::EPSILON) / (fov * 0.5).sin();
        let to_position = target - transform.front() * distance;

        self.path = Some(FocusPath {
            from_position: transform.position(),
            from_rotation: transform.rotation(),
            to_position,
            to_rotation: look_rotation(&(target - to_position)),
            t: 0.0,
        });
        self.state = FocusState::Focusing;
        log::debug!("Focusing on {:?} from distance {:.2}", target, distance);
        true
    }

    /// Apply one frame of input to the camera
    pub fn update(&mut self, scene: &mut Scene, input: &InputState, dt: f32) {
        if !scene.world().contains(self.camera) {
            return;
        }

        if input.key(KeyCode::F) == KeyState::Down {
            self.focus_selection(scene);
        }

        if self.apply_movement(scene.world_mut(), input, dt) {
            self.state = FocusState::Unfocused;
            self.path = None;
        }

        if self.state == FocusState::Focusing {
            self.advance_focus(scene.world_mut(), dt);
            return;
        }

        self.apply_look(scene.world_mut(), input);
        self.apply_zoom(scene.world_mut(), input);
    }

    fn focus_selection(&mut self, scene: &mut Scene) {
        let Some(selected) = scene.selected() else {
            return;
        };
        scene.refresh();
        let Some(entity) = scene.world().get(selected) else {
            return;
        };
        let (target, radius) = match entity.bounding_box().obb() {
            Some(obb) => (obb.center, obb.enclosing_radius()),
            None => (entity.transform().position(), 1.0),
        };
        self.setup_focus(scene.world(), target, radius);
    }

    /// Keyboard translation; true when the camera moved
    fn apply_movement(&self, world: &mut World, input: &InputState, dt: f32) -> bool {
        let Some(entity) = world.get(self.camera) else {
            return false;
        };
        let transform = entity.transform();
        let front = transform.front();
        let up = transform.up();
        let screen_right = front.cross(&up);

        let bindings = [
            (KeyCode::W, front),
            (KeyCode::S, -front),
            (KeyCode::D, screen_right),
            (KeyCode::A, -screen_right),
            (KeyCode::E, up),
            (KeyCode::Q, -up),
        ];
        let direction: Vec3 = bindings
            .iter()
            .filter(|(key, _)| input.is_key_pressed(*key))
            .map(|(_, axis)| *axis)
            .sum();

        if direction.norm_squared() <= f32::EPSILON {
            return false;
        }

        let mut speed = self.move_speed;
        if input.is_key_pressed(KeyCode::LeftShift) {
            speed *= FAST_MULTIPLIER;
        }
        let position = transform.position() + direction.normalize() * speed * dt;
        world.set_position(self.camera, position);
        true
    }

    fn apply_look(&mut self, world: &mut World, input: &InputState) {
        if !input.is_button_pressed(MouseButton::Right) {
            return;
        }
        let motion = input.mouse_motion();
        if motion.norm_squared() <= f32::EPSILON {
            return;
        }

        self.sync_angles(world);
        self.yaw -= motion.x * self.rotate_speed;
        self.pitch = (self.pitch + motion.y * self.rotate_speed).clamp(-PITCH_LIMIT, PITCH_LIMIT);

        let rotation =
            Quat::from_axis_angle(&Vec3::y_axis(), self.yaw) * Quat::from_axis_angle(&Vec3::x_axis(), self.pitch);
        world.set_rotation(self.camera, rotation);
        self.state = FocusState::Unfocused;
    }

    fn apply_zoom(&mut self, world: &mut World, input: &InputState) {
        let wheel = input.wheel();
        if wheel.abs() <= f32::EPSILON {
            return;
        }
        let Some(transform) = world.get(self.camera).map(|entity| entity.transform()) else {
            return;
        };
        let position = transform.position() + transform.front() * wheel * self.zoom_speed;
        world.set_position(self.camera, position);
        self.state = FocusState::Unfocused;
    }

    fn advance_focus(&mut self, world: &mut World, dt: f32) {
        let Some(path) = self.path.as_mut() else {
            self.state = FocusState::Unfocused;
            return;
        };

        path.t = if self.focus_duration > 0.0 {
            (path.t + dt / self.focus_duration).min(1.0)
        } else {
            1.0
        };

        let t = path.t;
        let position = path.from_position.lerp(&path.to_position, t);
        let rotation = path
            .from_rotation
            .try_slerp(&path.to_rotation, t, 1.0e-6)
            .unwrap_or(path.to_rotation);
        let done = t >= 1.0;

        world.set_position(self.camera, position);
        world.set_rotation(self.camera, rotation);

        if done {
            self.state = FocusState::Focused;
            self.path = None;
            log::debug!("Focus reached");
        }
    }

    /// Derive yaw and pitch from the camera's current view direction
    fn sync_angles(&mut self, world: &World) {
        let Some(front) = world.get(self.camera).map(|entity| entity.transform().front()) else {
            return;
        };
        self.yaw = front.x.atan2(front.z);
        self.pitch = (-front.y).clamp(-1.0, 1.0).asin();
    }
}
