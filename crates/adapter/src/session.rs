//! Game-loop side of the adapter: apply inbound commands to a session and
//! produce the replies.

use arrayvec::ArrayVec;
use log::debug;

use crate::core::GameState;
use crate::protocol::{create_ack, create_error, ErrorCode, LastEvent};
use crate::runtime::{ClientCommand, InboundCommand, InboundPayload, OutboundMessage};
use crate::server::build_observation;
use crate::types::GameAction;

/// Replies produced for one inbound command
pub type Replies = ArrayVec<OutboundMessage, 2>;

/// Owns the game session driven by remote clients.
#[derive(Debug, Clone)]
pub struct Session {
    game: GameState,
    obs_seq: u64,
}

impl Session {
    pub fn new(mut game: GameState) -> Self {
        game.start();
        Self { game, obs_seq: 0 }
    }

    pub fn game(&self) -> &GameState {
        &self.game
    }

    pub fn game_mut(&mut self) -> &mut GameState {
        &mut self.game
    }

    fn next_seq(&mut self) -> u64 {
        self.obs_seq += 1;
        self.obs_seq
    }

    fn observation(&mut self) -> crate::protocol::ObservationMessage {
        let last_event = self.game.take_last_event().map(LastEvent::from);
        let seq = self.next_seq();
        build_observation(seq, &self.game, last_event)
    }

    /// Apply one inbound command.
    ///
    /// Commands are acked with the number of actions that changed the game,
    /// then the new state is broadcast to streaming clients.
    pub fn handle(&mut self, inbound: InboundCommand) -> Replies {
        let mut out = Replies::new();
        let client_id = inbound.client_id;

        match inbound.payload {
            InboundPayload::SnapshotRequest => {
                let seq = self.next_seq();
                let obs = build_observation(seq, &self.game, None);
                out.push(OutboundMessage::ToClientObservation { client_id, obs });
            }
            InboundPayload::Command(ClientCommand::Actions(actions)) => {
                let resets = actions
                    .iter()
                    .any(|a| matches!(a, GameAction::Restart | GameAction::ToggleMode));
                if self.game.game_over() && !resets {
                    let err = create_error(inbound.seq, ErrorCode::GameOver, "Game is over; restart first");
                    out.push(OutboundMessage::ToClientError { client_id, err });
                    return out;
                }

                let applied = actions
                    .iter()
                    .filter(|a| self.game.apply_action(**a))
                    .count() as u32;
                debug!(
                    "client {} seq {}: {} of {} actions applied",
                    client_id,
                    inbound.seq,
                    applied,
                    actions.len()
                );

                out.push(OutboundMessage::ToClientAck {
                    client_id,
                    ack: create_ack(inbound.seq, applied),
                });
                let obs = self.observation();
                out.push(OutboundMessage::BroadcastObservation { obs });
            }
        }
        out
    }

    /// Advance the time-attack countdown; broadcasts the final state on expiry.
    pub fn tick(&mut self, elapsed_ms: u32) -> Option<OutboundMessage> {
        if self.game.tick(elapsed_ms) {
            let obs = self.observation();
            return Some(OutboundMessage::BroadcastObservation { obs });
        }
        None
    }
}
