//! Transform state for the RWX interpreter.
//!
//! Two stacks nest independently: the scope stack follows model and clump
//! boundaries, the save stack follows `transformbegin`/`transformend`.
//! Edits always right-multiply the current matrix, so the statement written
//! first is applied to vertices last.

use rwx_math::{axis_weighted_rotation, Mat4, Vec3};

use super::command::Command;

#[derive(Clone, Debug)]
pub struct TransformStack {
    current: Mat4,
    scopes: Vec<Mat4>,
    saves: Vec<Mat4>,
}

impl Default for TransformStack {
    fn default() -> Self {
        Self::new()
    }
}

impl TransformStack {
    pub fn new() -> Self {
        Self {
            current: Mat4::IDENTITY,
            scopes: Vec::new(),
            saves: Vec::new(),
        }
    }

    /// The matrix being edited in the innermost scope.
    pub fn current(&self) -> Mat4 {
        self.current
    }

    pub fn scope_depth(&self) -> usize {
        self.scopes.len()
    }

    pub fn identity(&mut self) {
        self.current = Mat4::IDENTITY;
    }

    /// Replace the current matrix with sixteen column-major values.
    ///
    /// A last value of exactly 0 is read as 1; legacy exporters write 0
    /// there for plain affine transforms.
    pub fn set_matrix(&mut self, mut values: [f32; 16]) {
        if values[15] == 0.0 {
            values[15] = 1.0;
        }
        self.current = Mat4::from_cols_array(&values);
    }

    pub fn translate(&mut self, offset: Vec3) {
        self.current *= Mat4::from_translation(offset);
    }

    pub fn scale(&mut self, factors: Vec3) {
        self.current *= Mat4::from_scale(factors);
    }

    pub fn rotate(&mut self, axis: Vec3, angle_degrees: f32) {
        self.current *= axis_weighted_rotation(axis, angle_degrees);
    }

    /// Enter a model or clump scope with a fresh identity matrix.
    pub fn push_scope(&mut self) {
        self.scopes.push(self.current);
        self.current = Mat4::IDENTITY;
    }

    /// Leave the innermost scope. Returns false if no scope was open.
    pub fn pop_scope(&mut self) -> bool {
        match self.scopes.pop() {
            Some(matrix) => {
                self.current = matrix;
                true
            }
            None => false,
        }
    }

    pub fn save(&mut self) {
        self.saves.push(self.current);
    }

    /// Restore the last saved matrix, or identity if nothing was saved.
    pub fn restore(&mut self) {
        self.current = self.saves.pop().unwrap_or(Mat4::IDENTITY);
    }

    /// Every enclosing scope, outermost first, followed by the current matrix.
    pub fn final_transform(&self) -> Mat4 {
        self.scopes
            .iter()
            .fold(Mat4::IDENTITY, |acc, scope| acc * *scope)
            * self.current
    }

    /// Apply a transform-editing command. Returns false for any other command.
    pub fn apply(&mut self, command: &Command) -> bool {
        match command {
            Command::Identity => self.identity(),
            Command::Transform(values) => self.set_matrix(*values),
            Command::Translate(offset) => self.translate(*offset),
            Command::Scale(factors) => self.scale(*factors),
            Command::Rotate { axis, angle } => self.rotate(*axis, *angle),
            Command::TransformBegin => self.save(),
            Command::TransformEnd => self.restore(),
            _ => return false,
        }
        true
    }
}
