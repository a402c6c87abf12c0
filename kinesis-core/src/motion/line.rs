//! Line compiler
//!
//! Turns a decoded line command into an immutable [`LineDescriptor`]. The
//! descriptor is queued as a fixed-size postcard payload and decoded again
//! by the exec layer when its turn comes.

use num_traits::float::Float;
use serde::{Deserialize, Serialize};

use kinesis_protocol::{Axes, CommandReader, AXES, PHASES};

use crate::error::{CommandError, Fault};

/// Encoded descriptor size in bytes
///
/// Postcard writes every `f32` as four little-endian bytes and fixed-size
/// arrays without a length prefix, so the size does not depend on content.
pub const DESCRIPTOR_SIZE: usize = 4 * (3 * AXES + PHASES + 4);

/// Storage size of one queued line
pub const fn descriptor_size() -> usize {
    DESCRIPTOR_SIZE
}

/// A fully parsed jerk-limited line move
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LineDescriptor {
    /// Position at the start of the move
    pub start: Axes,
    /// Position at the end of the move
    pub target: Axes,
    /// Phase durations in seconds
    pub times: [f32; PHASES],
    /// Velocity at the end of the move
    pub target_vel: f32,
    /// Acceleration limit
    pub max_accel: f32,
    /// Jerk limit
    pub max_jerk: f32,
    /// Unit direction vector (zero where the axis does not move)
    pub unit: Axes,
    /// Euclidean move length
    pub length: f32,
}

impl LineDescriptor {
    /// Build a descriptor, deriving the direction vector and length
    pub fn new(
        start: Axes,
        target: Axes,
        times: [f32; PHASES],
        target_vel: f32,
        max_accel: f32,
        max_jerk: f32,
    ) -> Self {
        let mut unit = [0.0; AXES];
        let mut length = 0.0f32;
        for axis in 0..AXES {
            unit[axis] = target[axis] - start[axis];
            length += unit[axis] * unit[axis];
        }

        let length = length.sqrt();
        for component in unit.iter_mut() {
            if *component != 0.0 {
                *component /= length;
            }
        }

        Self {
            start,
            target,
            times,
            target_vel,
            max_accel,
            max_jerk,
            unit,
            length,
        }
    }

    /// Index of the first phase with a nonzero duration
    pub fn first_phase(&self) -> Option<usize> {
        self.next_phase(None)
    }

    /// Index of the next nonzero phase after `phase`
    pub fn next_phase(&self, phase: Option<usize>) -> Option<usize> {
        let from = phase.map_or(0, |p| p + 1);
        (from..PHASES).find(|&p| self.times[p] != 0.0)
    }

    /// Position at `distance` along the move
    pub fn point_at(&self, distance: f32) -> Axes {
        let mut point = [0.0; AXES];
        for axis in 0..AXES {
            point[axis] = self.start[axis] + self.unit[axis] * distance;
        }
        point
    }

    /// Total duration of all phases
    pub fn duration(&self) -> f32 {
        self.times.iter().sum()
    }

    /// Encode into `buf`, returning the written bytes
    pub fn encode<'a>(&self, buf: &'a mut [u8]) -> Result<&'a mut [u8], CommandError> {
        postcard::to_slice(self, buf).map_err(|_| CommandError::QueueFull)
    }

    /// Decode a queued payload
    pub fn decode(bytes: &[u8]) -> Result<Self, Fault> {
        postcard::from_bytes(bytes).map_err(|_| Fault::BadDescriptor)
    }
}

/// Parse the arguments of a line command
///
/// `reader` must be positioned just past the opcode. Unspecified axes keep
/// their value from `start`. Nothing outside the returned descriptor is
/// modified, so a failed parse leaves no trace.
pub fn compile_line(
    reader: &mut CommandReader<'_>,
    start: &Axes,
) -> Result<LineDescriptor, CommandError> {
    let target_vel = read_non_negative(reader)?;
    let max_accel = read_non_negative(reader)?;
    let max_jerk = read_non_negative(reader)?;

    let mut target = *start;
    reader.read_axes(&mut target)?;

    let mut times = [0.0; PHASES];
    let mut has_time = false;
    while let Some(phase) = reader.read_phase() {
        let time = reader.read_float()?;
        if time < 0.0 {
            return Err(CommandError::NegativeScurveTime);
        }
        times[phase] = time;
        if time != 0.0 {
            has_time = true;
        }
    }

    if !has_time {
        return Err(CommandError::AllZeroScurveTimes);
    }

    reader.finish()?;

    Ok(LineDescriptor::new(
        *start, target, times, target_vel, max_accel, max_jerk,
    ))
}

fn read_non_negative(reader: &mut CommandReader<'_>) -> Result<f32, CommandError> {
    let value = reader.read_float()?;
    if value < 0.0 {
        return Err(CommandError::InvalidArguments);
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kinesis_protocol::{encode_float, LineCommand};

    fn line(
        target: [Option<f32>; AXES],
        times: [f32; PHASES],
    ) -> heapless::Vec<u8, { kinesis_protocol::MAX_COMMAND_LEN }> {
        LineCommand {
            target_vel: 5.0,
            max_accel: 100.0,
            max_jerk: 1000.0,
            target,
            times,
        }
        .encode()
        .unwrap()
    }

    fn compile(bytes: &[u8], start: &Axes) -> Result<LineDescriptor, CommandError> {
        let mut reader = CommandReader::new(&bytes[1..]);
        compile_line(&mut reader, start)
    }

    #[test]
    fn test_compile_basic() {
        let cmd = line(
            [Some(3.0), Some(4.0), None, None],
            [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0],
        );
        let start = [0.0, 0.0, 7.0, 1.0];
        let desc = compile(&cmd, &start).unwrap();

        assert_eq!(desc.start, start);
        assert_eq!(desc.target, [3.0, 4.0, 7.0, 1.0]);
        assert_eq!(desc.length, 5.0);
        assert_eq!(desc.unit, [0.6, 0.8, 0.0, 0.0]);
        assert_eq!(desc.target_vel, 5.0);
        assert_eq!(desc.first_phase(), Some(3));
        assert_eq!(desc.next_phase(Some(3)), None);
    }

    #[test]
    fn test_zero_length_move() {
        let cmd = line([None; AXES], [0.5, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        let desc = compile(&cmd, &[1.0, 2.0, 3.0, 4.0]).unwrap();

        assert_eq!(desc.length, 0.0);
        assert_eq!(desc.unit, [0.0; AXES]);
        assert_eq!(desc.point_at(0.0), [1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_all_zero_times() {
        let cmd = line([Some(1.0), None, None, None], [0.0; PHASES]);
        assert_eq!(
            compile(&cmd, &[0.0; AXES]),
            Err(CommandError::AllZeroScurveTimes)
        );
    }

    #[test]
    fn test_negative_time() {
        let cmd = line(
            [Some(1.0), None, None, None],
            [0.1, 0.0, -0.2, 0.0, 0.0, 0.0, 0.0],
        );
        assert_eq!(
            compile(&cmd, &[0.0; AXES]),
            Err(CommandError::NegativeScurveTime)
        );
    }

    #[test]
    fn test_negative_limits() {
        for index in 0..3 {
            let mut values = [5.0f32, 100.0, 1000.0];
            values[index] = -1.0;

            let mut cmd: heapless::Vec<u8, 64> = heapless::Vec::new();
            cmd.push(b'l').unwrap();
            for v in values {
                cmd.extend_from_slice(&encode_float(v).unwrap()).unwrap();
            }
            cmd.push(b'3').unwrap();
            cmd.extend_from_slice(&encode_float(1.0).unwrap()).unwrap();

            assert_eq!(
                compile(&cmd, &[0.0; AXES]),
                Err(CommandError::InvalidArguments)
            );
        }
    }

    #[test]
    fn test_bad_float() {
        assert_eq!(compile(b"lAAC", &[0.0; AXES]), Err(CommandError::BadFloat));

        let mut cmd = line([None; AXES], [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0]);
        cmd.extend_from_slice(b"5AA").unwrap();
        assert_eq!(compile(&cmd, &[0.0; AXES]), Err(CommandError::BadFloat));
    }

    #[test]
    fn test_trailing_input() {
        let mut cmd = line([None; AXES], [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0]);
        cmd.push(b'#').unwrap();
        assert_eq!(
            compile(&cmd, &[0.0; AXES]),
            Err(CommandError::InvalidArguments)
        );
    }

    #[test]
    fn test_repeated_phase_overwrites() {
        let mut cmd = line([None; AXES], [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0]);
        cmd.push(b'3').unwrap();
        cmd.extend_from_slice(&encode_float(0.25).unwrap()).unwrap();

        let desc = compile(&cmd, &[0.0; AXES]).unwrap();
        assert_eq!(desc.times[3], 0.25);
    }

    #[test]
    fn test_encoded_size_is_fixed() {
        let desc = LineDescriptor::new(
            [0.0; AXES],
            [1.5, -2.0, 1e6, 0.0],
            [0.1, 0.2, 0.1, 1.0, 0.1, 0.2, 0.1],
            12.0,
            500.0,
            20000.0,
        );

        let mut buf = [0u8; 128];
        let bytes = desc.encode(&mut buf).unwrap();
        assert_eq!(bytes.len(), DESCRIPTOR_SIZE);
        assert_eq!(descriptor_size(), 92);

        let decoded = LineDescriptor::decode(bytes).unwrap();
        assert_eq!(decoded, desc);
    }

    #[test]
    fn test_decode_short_payload() {
        assert_eq!(LineDescriptor::decode(&[0u8; 10]), Err(Fault::BadDescriptor));
    }
}
