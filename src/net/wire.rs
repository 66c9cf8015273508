//! Fixed-size wire frame
//!
//! Every message is exactly [`FRAME_LEN`] bytes, little-endian:
//!
//! | offset | size | field       |
//! |--------|------|-------------|
//! | 0      | 1    | version     |
//! | 1      | 1    | type        |
//! | 2      | 2    | reserved    |
//! | 4      | 4    | seq         |
//! | 8      | 4    | player_id   |
//! | 12     | 4    | x (f32)     |
//! | 16     | 4    | y (f32)     |
//! | 20     | 4    | z (f32)     |
//! | 24     | 4    | rotation    |
//! | 28     | 4    | data (i32)  |

use bytemuck::{Pod, Zeroable};

use crate::error::ProtocolError;

pub const PROTOCOL_VERSION: u8 = 1;
pub const FRAME_LEN: usize = 32;

/// Speed is carried in `data` as fixed point
pub const SPEED_SCALE: f32 = 10_000.0;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MessageType {
    PlayerPosition = 1,
    BallPosition = 2,
    PowerupSpawn = 3,
    PowerupCollected = 4,
    GoalScored = 5,
    PlayerJoin = 6,
    PlayerLeave = 7,
}

impl TryFrom<u8> for MessageType {
    type Error = ProtocolError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Ok(match code {
            1 => MessageType::PlayerPosition,
            2 => MessageType::BallPosition,
            3 => MessageType::PowerupSpawn,
            4 => MessageType::PowerupCollected,
            5 => MessageType::GoalScored,
            6 => MessageType::PlayerJoin,
            7 => MessageType::PlayerLeave,
            other => return Err(ProtocolError::UnknownType(other)),
        })
    }
}

/// Decoded message. Field meaning depends on `kind`:
///
/// - `PlayerPosition`: pose in x/z, heading in `rotation`, speed in `data`
/// - `BallPosition`: ball center in x/y/z
/// - `PowerupSpawn`: `player_id` is the power-up id, x/z its spot, `data` its kind
/// - `PowerupCollected`: `player_id` is the power-up id, `data` the collector
/// - `GoalScored`: `data` is the scoring team, `x` its new total
/// - `PlayerJoin`: `data` is the team
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NetworkMessage {
    pub kind: MessageType,
    pub seq: u32,
    pub player_id: u32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub rotation: f32,
    pub data: i32,
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct Frame {
    version: u8,
    kind: u8,
    reserved: [u8; 2],
    seq: u32,
    player_id: u32,
    x: u32,
    y: u32,
    z: u32,
    rotation: u32,
    data: u32,
}

impl NetworkMessage {
    pub fn new(kind: MessageType, player_id: u32) -> Self {
        Self {
            kind,
            seq: 0,
            player_id,
            x: 0.0,
            y: 0.0,
            z: 0.0,
            rotation: 0.0,
            data: 0,
        }
    }

    pub fn with_position(mut self, x: f32, y: f32, z: f32) -> Self {
        self.x = x;
        self.y = y;
        self.z = z;
        self
    }

    pub fn with_rotation(mut self, rotation: f32) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_data(mut self, data: i32) -> Self {
        self.data = data;
        self
    }

    pub fn encode(&self) -> [u8; FRAME_LEN] {
        let frame = Frame {
            version: PROTOCOL_VERSION,
            kind: self.kind as u8,
            reserved: [0; 2],
            seq: self.seq.to_le(),
            player_id: self.player_id.to_le(),
            x: self.x.to_bits().to_le(),
            y: self.y.to_bits().to_le(),
            z: self.z.to_bits().to_le(),
            rotation: self.rotation.to_bits().to_le(),
            data: (self.data as u32).to_le(),
        };
        bytemuck::cast(frame)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        if bytes.len() != FRAME_LEN {
            return Err(ProtocolError::FrameLength {
                expected: FRAME_LEN,
                actual: bytes.len(),
            });
        }
        let frame: Frame = bytemuck::pod_read_unaligned(bytes);
        if frame.version != PROTOCOL_VERSION {
            return Err(ProtocolError::Version {
                local: PROTOCOL_VERSION,
                received: frame.version,
            });
        }
        let msg = Self {
            kind: MessageType::try_from(frame.kind)?,
            seq: u32::from_le(frame.seq),
            player_id: u32::from_le(frame.player_id),
            x: f32::from_bits(u32::from_le(frame.x)),
            y: f32::from_bits(u32::from_le(frame.y)),
            z: f32::from_bits(u32::from_le(frame.z)),
            rotation: f32::from_bits(u32::from_le(frame.rotation)),
            data: u32::from_le(frame.data) as i32,
        };
        // NaN or infinity would poison every body it touches
        for (field, value) in [
            ("x", msg.x),
            ("y", msg.y),
            ("z", msg.z),
            ("rotation", msg.rotation),
        ] {
            if !value.is_finite() {
                return Err(ProtocolError::NonFinite { field });
            }
        }
        Ok(msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_is_32_bytes() {
        assert_eq!(std::mem::size_of::<Frame>(), FRAME_LEN);
    }

    #[test]
    fn test_layout_is_little_endian() {
        let mut msg = NetworkMessage::new(MessageType::GoalScored, 0x0102_0304)
            .with_position(1.0, 0.0, 0.0)
            .with_data(-2);
        msg.seq = 9;
        let bytes = msg.encode();

        assert_eq!(bytes[0], PROTOCOL_VERSION);
        assert_eq!(bytes[1], 5);
        assert_eq!(&bytes[2..4], &[0, 0]);
        assert_eq!(&bytes[4..8], &[9, 0, 0, 0]);
        assert_eq!(&bytes[8..12], &[4, 3, 2, 1]);
        assert_eq!(&bytes[12..16], &1.0f32.to_le_bytes());
        assert_eq!(&bytes[28..32], &(-2i32).to_le_bytes());

        assert_eq!(NetworkMessage::decode(&bytes), Ok(msg));
    }

    #[test]
    fn test_rejects_bad_frames() {
        let bytes = NetworkMessage::new(MessageType::PlayerJoin, 1).encode();

        assert_eq!(
            NetworkMessage::decode(&bytes[..31]),
            Err(ProtocolError::FrameLength { expected: 32, actual: 31 })
        );

        let mut unknown = bytes;
        unknown[1] = 42;
        assert_eq!(
            NetworkMessage::decode(&unknown),
            Err(ProtocolError::UnknownType(42))
        );

        let mut future = bytes;
        future[0] = 2;
        assert_eq!(
            NetworkMessage::decode(&future),
            Err(ProtocolError::Version { local: 1, received: 2 })
        );

        let nan = NetworkMessage::new(MessageType::PlayerPosition, 1)
            .with_position(f32::NAN, 0.0, 0.0)
            .encode();
        assert_eq!(
            NetworkMessage::decode(&nan),
            Err(ProtocolError::NonFinite { field: "x" })
        );
        let spinning = NetworkMessage::new(MessageType::PlayerPosition, 1)
            .with_rotation(f32::INFINITY)
            .encode();
        assert_eq!(
            NetworkMessage::decode(&spinning),
            Err(ProtocolError::NonFinite { field: "rotation" })
        );
    }
}
