//! Drag-gesture input capture
//!
//! The host feeds discrete [`DragEvent`]s. At most one aim session is open at
//! a time and a completed drag closes its session *before* the action is
//! handed back, so one gesture can never launch twice.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::ballistics::power_from_drag;
use super::state::{AimPreview, AimVector};
use crate::error::DuelError;

/// One phase of a drag gesture (angle in degrees)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DragEvent {
    Start { center: Vec2 },
    Move { distance: f32, angle: f32 },
    End { distance: f32, angle: f32 },
}

/// What a session's drag will be used for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AimPurpose {
    Jump,
    Shot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AimSession {
    pub id: SessionId,
    pub purpose: AimPurpose,
    /// Where the current drag began, once it has
    pub start: Option<Vec2>,
}

/// A completed drag, already detached from its session
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletedAim {
    pub session: AimSession,
    pub aim: AimVector,
}

/// Single-session drag capture
#[derive(Debug, Clone, Default)]
pub struct InputCapture {
    session: Option<AimSession>,
    preview: Option<AimPreview>,
    next_id: u64,
}

impl InputCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a session, closing any previous one first
    pub fn open(&mut self, purpose: AimPurpose) -> SessionId {
        if let Some(previous) = self.close() {
            log::debug!("Closing {:?} before opening a {:?} session", previous.id, purpose);
        }
        let id = SessionId(self.next_id);
        self.next_id += 1;
        self.session = Some(AimSession {
            id,
            purpose,
            start: None,
        });
        id
    }

    pub fn close(&mut self) -> Option<AimSession> {
        self.preview = None;
        self.session.take()
    }

    pub fn session(&self) -> Option<&AimSession> {
        self.session.as_ref()
    }

    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    pub fn preview(&self) -> Option<&AimPreview> {
        self.preview.as_ref()
    }

    /// Feed one drag event
    ///
    /// Returns the completed aim on `End`. Events with no open session are
    /// ignored. Invalid values leave the session open for a retry.
    pub fn handle(&mut self, event: DragEvent, viewport_height: f32) -> Result<Option<CompletedAim>, DuelError> {
        let Some(session) = self.session.as_mut() else {
            log::debug!("Ignoring {:?}: no aim session open", event);
            return Ok(None);
        };

        match event {
            DragEvent::Start { center } => {
                if !center.is_finite() {
                    return Err(DuelError::invalid_aim("drag start is not finite"));
                }
                session.start = Some(center);
                self.preview = Some(AimPreview {
                    start: center,
                    angle_deg: 0.0,
                    power: 0.0,
                });
                Ok(None)
            }
            DragEvent::Move { distance, angle } => {
                let aim = checked_aim(distance, angle, viewport_height)?;
                self.preview = Some(AimPreview {
                    start: session.start.unwrap_or(Vec2::ZERO),
                    angle_deg: aim.angle_deg,
                    power: aim.power,
                });
                Ok(None)
            }
            DragEvent::End { distance, angle } => {
                let aim = checked_aim(distance, angle, viewport_height)?;
                let session = *session;
                self.close();
                Ok(Some(CompletedAim { session, aim }))
            }
        }
    }
}

fn checked_aim(distance: f32, angle: f32, viewport_height: f32) -> Result<AimVector, DuelError> {
    if !angle.is_finite() {
        return Err(DuelError::invalid_aim(format!("drag angle {angle} is not finite")));
    }
    let power = power_from_drag(distance, viewport_height)?;
    Ok(AimVector::new(angle, power))
}
