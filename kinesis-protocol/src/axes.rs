//! Axis words
//!
//! The controller drives a fixed set of linear/rotary axes. A position is
//! carried as one float per axis; on the wire each coordinate is an axis
//! letter followed by a float.

/// Number of axes
pub const AXES: usize = 4;

/// Axis letters in index order
pub const AXIS_LETTERS: [u8; AXES] = [b'x', b'y', b'z', b'a'];

/// One coordinate per axis
pub type Axes = [f32; AXES];

/// Map an axis letter to its index
pub fn axis_from_letter(letter: u8) -> Option<usize> {
    AXIS_LETTERS.iter().position(|&l| l == letter)
}

/// Map an axis index to its letter
pub fn axis_letter(axis: usize) -> Option<u8> {
    AXIS_LETTERS.get(axis).copied()
}
