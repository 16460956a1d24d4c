use glam::{Affine3A, Mat4, Vec3, Vec3A};

/// Depth offset of the home view.
pub const HOME_DEPTH: f32 = -50.0;
/// Farthest the view may back away from the look point.
pub const MIN_DEPTH: f32 = -100.0;
/// Closest the view may get to the look point.
pub const MAX_DEPTH: f32 = -2.0;
/// Eye position relative to the followed body.
pub const FOLLOW_OFFSET: Vec3 = Vec3::new(0.0, 0.0, -12.0);

/// Interactive view transform with a manual mode and a follow mode.
///
/// Manual operations compose onto the stored view. While following, the view
/// is rebuilt from scratch on every [`CameraController::update_if_following`],
/// so manual changes made in the meantime do not survive.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraController {
    view: Affine3A,
    following: bool,
}

impl Default for CameraController {
    fn default() -> Self {
        Self::new()
    }
}

impl CameraController {
    pub fn new() -> Self {
        Self {
            view: home_view(),
            following: false,
        }
    }

    pub fn view(&self) -> Affine3A {
        self.view
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::from(self.view)
    }

    /// Translation of the view along its depth axis.
    pub fn depth(&self) -> f32 {
        self.view.translation.z
    }

    pub fn is_following(&self) -> bool {
        self.following
    }

    /// Two-axis valuator with a fixed up axis. Drag distances are normalised by
    /// the viewport and scaled by the current distance, so the scene turns
    /// faster when viewed from far away.
    pub fn orbit(&mut self, dx: f32, dy: f32, width: f32, height: f32) {
        if width <= 0.0 || height <= 0.0 {
            return;
        }
        let factor = self.depth().abs();

        self.view = self.view * Affine3A::from_axis_angle(Vec3::Y, dx * factor / width);

        let right: Vec3 = (self.view.matrix3.inverse() * Vec3A::X).into();
        let right = right.normalize_or_zero();
        if right != Vec3::ZERO {
            self.view = self.view * Affine3A::from_axis_angle(right, dy * factor / height);
        }
    }

    /// Moves along the view axis, clamped to `[MIN_DEPTH, MAX_DEPTH]`.
    pub fn zoom(&mut self, delta: f32) {
        self.view.translation.z = (self.view.translation.z + delta).clamp(MIN_DEPTH, MAX_DEPTH);
    }

    pub fn reset_home(&mut self) {
        self.view = home_view();
    }

    /// Drops all rotation but keeps the current translation.
    pub fn reset_orientation(&mut self) {
        self.view.matrix3 = glam::Mat3A::IDENTITY;
    }

    /// Only flips the mode; the view changes on the next follow update.
    pub fn toggle_follow(&mut self) -> bool {
        self.following = !self.following;
        self.following
    }

    /// Rebuilds the view to look at `target` from [`FOLLOW_OFFSET`] when following.
    pub fn update_if_following(&mut self, target: Vec3) {
        if !self.following {
            return;
        }
        self.view = Affine3A::look_at_rh(target + FOLLOW_OFFSET, target, Vec3::Y);
    }
}

fn home_view() -> Affine3A {
    Affine3A::from_translation(Vec3::new(0.0, 0.0, HOME_DEPTH))
}

#[cfg(test)]
mod tests {
    use glam::Mat3A;

    use super::*;

    const EPS: f32 = 1e-4;

    #[test]
    fn zoom_is_clamped_both_ways() {
        let mut camera = CameraController::new();
        for _ in 0..10 {
            camera.zoom(-1000.0);
            assert!(camera.depth() >= MIN_DEPTH);
        }
        assert_eq!(camera.depth(), MIN_DEPTH);
        for _ in 0..10 {
            camera.zoom(1000.0);
            assert!(camera.depth() <= MAX_DEPTH);
        }
        assert_eq!(camera.depth(), MAX_DEPTH);
    }

    #[test]
    fn small_zoom_moves_linearly() {
        let mut camera = CameraController::new();
        camera.zoom(3.0);
        assert!((camera.depth() - (HOME_DEPTH + 3.0)).abs() < EPS);
    }

    #[test]
    fn horizontal_drag_rotates_about_up_scaled_by_distance() {
        let mut camera = CameraController::new();
        // 50 * 6.4 / 640 = 0.5 rad
        camera.orbit(6.4, 0.0, 640.0, 360.0);
        assert!(camera
            .view()
            .matrix3
            .abs_diff_eq(Mat3A::from_rotation_y(0.5), EPS));
        assert!(camera
            .view()
            .translation
            .abs_diff_eq(Vec3A::new(0.0, 0.0, HOME_DEPTH), EPS));

        let mut close = CameraController::new();
        close.zoom(40.0);
        close.orbit(6.4, 0.0, 640.0, 360.0);
        assert!(close.view().matrix3.abs_diff_eq(Mat3A::from_rotation_y(0.1), EPS));
    }

    #[test]
    fn vertical_drag_tilts_about_right_axis() {
        let mut camera = CameraController::new();
        // 50 * 3.6 / 360 = 0.5 rad
        camera.orbit(0.0, 3.6, 640.0, 360.0);
        assert!(camera
            .view()
            .matrix3
            .abs_diff_eq(Mat3A::from_rotation_x(0.5), EPS));
    }

    #[test]
    fn drags_accumulate() {
        let mut twice = CameraController::new();
        twice.orbit(3.2, 0.0, 640.0, 360.0);
        twice.orbit(3.2, 0.0, 640.0, 360.0);
        let mut once = CameraController::new();
        once.orbit(6.4, 0.0, 640.0, 360.0);
        assert!(twice.view().abs_diff_eq(once.view(), EPS));
    }

    #[test]
    fn degenerate_viewport_is_ignored() {
        let mut camera = CameraController::new();
        camera.orbit(10.0, 10.0, 0.0, 0.0);
        assert_eq!(camera, CameraController::new());
    }

    #[test]
    fn reset_orientation_keeps_zoom() {
        let mut camera = CameraController::new();
        camera.zoom(20.0);
        camera.orbit(5.0, 7.0, 640.0, 360.0);
        let depth = camera.view().translation;
        camera.reset_orientation();
        assert_eq!(camera.view().matrix3, Mat3A::IDENTITY);
        assert_eq!(camera.view().translation, depth);
    }

    #[test]
    fn reset_home_restores_default_view() {
        let mut camera = CameraController::new();
        camera.zoom(20.0);
        camera.orbit(5.0, 7.0, 640.0, 360.0);
        camera.reset_home();
        assert_eq!(camera.view(), CameraController::new().view());
    }

    #[test]
    fn toggling_follow_leaves_view_alone() {
        let mut camera = CameraController::new();
        let before = camera.view();
        assert!(camera.toggle_follow());
        assert_eq!(camera.view(), before);
        assert!(!camera.toggle_follow());
    }

    #[test]
    fn follow_targets_each_new_position() {
        let mut camera = CameraController::new();
        camera.update_if_following(Vec3::new(3.0, 0.0, 1.0));
        assert_eq!(camera.view(), CameraController::new().view());

        camera.toggle_follow();
        let first = Vec3::new(12.0, 0.0, 12.0);
        camera.update_if_following(first);
        let first_view = camera.view();
        assert!(first_view
            .transform_point3(first)
            .abs_diff_eq(Vec3::new(0.0, 0.0, FOLLOW_OFFSET.length() * -1.0), EPS));

        let second = Vec3::new(0.0, 0.0, 24.0);
        camera.update_if_following(second);
        assert!(!camera.view().abs_diff_eq(first_view, EPS));
        assert!(camera
            .view()
            .transform_point3(second)
            .abs_diff_eq(Vec3::new(0.0, 0.0, -12.0), EPS));
    }

    #[test]
    fn manual_changes_are_overwritten_while_following() {
        let mut camera = CameraController::new();
        camera.toggle_follow();
        let target = Vec3::new(12.0, 0.0, 12.0);
        camera.update_if_following(target);
        let followed = camera.view();
        camera.zoom(5.0);
        camera.orbit(10.0, 4.0, 640.0, 360.0);
        camera.update_if_following(target);
        assert!(camera.view().abs_diff_eq(followed, EPS));
    }
}
