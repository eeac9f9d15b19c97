//! Per-chat dialogue state for the bot front end.
//!
//! The bot collects a new advert's fields one message at a time:
//! destination chat id, then text, then interval, then the time within the
//! interval. Each chat has its own [`SessionState`]; an invalid input
//! re-prompts without losing what was already collected. Authentication is
//! outside this crate, so the caller passes the logged-in owner with every
//! message.
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::advert::{AdvertError, AdvertService};
use crate::clock::Clock;
use crate::job::ChatId;
use crate::recurrence::Recurrence;
use crate::store::{AdvertStore, StoreError};

/// Menu selections the front end maps its buttons onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    NewAdvert,
    ListAdverts,
    DeleteAdvert,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum SessionState {
    Menu,
    AwaitingDestination,
    AwaitingText {
        destination: ChatId,
    },
    AwaitingInterval {
        destination: ChatId,
        text: String,
    },
    AwaitingTime {
        destination: ChatId,
        text: String,
        interval: String,
    },
    AwaitingDeleteId,
}

/// Dialogue sessions keyed by the chat the conversation happens in.
pub struct SessionManager<S, C> {
    service: Arc<AdvertService<S, C>>,
    sessions: Mutex<HashMap<ChatId, SessionState>>,
}

impl<S, C> SessionManager<S, C>
where
    S: AdvertStore,
    C: Clock,
{
    pub fn new(service: Arc<AdvertService<S, C>>) -> Self {
        Self {
            service,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Handles a menu selection, returning the reply to send back.
    pub async fn handle_command(
        &self,
        chat: ChatId,
        owner: &str,
        command: Command,
    ) -> Result<String, AdvertError> {
        match command {
            Command::NewAdvert => {
                self.set_state(chat, SessionState::AwaitingDestination);
                Ok("Write the chat id where you want to post your advert:".to_owned())
            }
            Command::ListAdverts => {
                let adverts = self.service.list_adverts(owner).await?;
                if adverts.is_empty() {
                    Ok("No previously saved adverts were found.".to_owned())
                } else {
                    Ok(adverts
                        .iter()
                        .map(|record| {
                            format!(
                                "#{}: \"{}\" to chat {} every {}",
                                record.id, record.text, record.destination, record.recurrence_spec
                            )
                        })
                        .collect::<Vec<_>>()
                        .join("\n"))
                }
            }
            Command::DeleteAdvert => {
                self.set_state(chat, SessionState::AwaitingDeleteId);
                Ok("Write the id of the advert you want to delete:".to_owned())
            }
        }
    }

    /// Advances the chat's dialogue with one user message, returning the
    /// reply to send back.
    pub async fn handle_message(
        &self,
        chat: ChatId,
        owner: &str,
        message: &str,
    ) -> Result<String, AdvertError> {
        let state = self.state(chat);
        match state {
            SessionState::Menu => Ok("Select what you want to do.".to_owned()),
            SessionState::AwaitingDestination => match message.trim().parse::<i64>() {
                Ok(destination) => {
                    self.set_state(
                        chat,
                        SessionState::AwaitingText {
                            destination: destination.into(),
                        },
                    );
                    Ok("Write the text for your advert:".to_owned())
                }
                Err(_) => Ok("That doesn't look like a chat id. Try again:".to_owned()),
            },
            SessionState::AwaitingText { destination } => {
                self.set_state(
                    chat,
                    SessionState::AwaitingInterval {
                        destination,
                        text: message.to_owned(),
                    },
                );
                Ok("Write the interval of sending the advert (day, hour, minute):".to_owned())
            }
            SessionState::AwaitingInterval { destination, text } => {
                let interval = message.trim().to_lowercase();
                match time_format_hint(&interval) {
                    Some(hint) => {
                        self.set_state(
                            chat,
                            SessionState::AwaitingTime {
                                destination,
                                text,
                                interval,
                            },
                        );
                        Ok(format!(
                            "What time must the advert be sent at? (format '{hint}')"
                        ))
                    }
                    None => Ok("Hmm... Try again:".to_owned()),
                }
            }
            SessionState::AwaitingTime {
                destination,
                text,
                interval,
            } => match Recurrence::parse(&interval, message.trim()) {
                Ok(recurrence) => {
                    let id = self
                        .service
                        .create_advert(owner, destination, &text, &recurrence.to_string())
                        .await?;
                    self.set_state(chat, SessionState::Menu);
                    Ok(format!("Your advert was saved with id {id}."))
                }
                Err(err) => {
                    // Keep the collected fields and ask for the time again.
                    self.set_state(
                        chat,
                        SessionState::AwaitingTime {
                            destination,
                            text,
                            interval,
                        },
                    );
                    Ok(format!("{err}. Try again:"))
                }
            },
            SessionState::AwaitingDeleteId => {
                let id: i64 = match message.trim().parse() {
                    Ok(id) => id,
                    Err(_) => {
                        return Ok("That doesn't look like an advert id. Try again:".to_owned())
                    }
                };
                match self.service.delete_advert(id.into()).await {
                    Ok(()) => {
                        self.set_state(chat, SessionState::Menu);
                        Ok("The advert was successfully deleted.".to_owned())
                    }
                    Err(AdvertError::Store(StoreError::NotFound(_))) => Ok(format!(
                        "Hmmm... There is no advert with id {id}. Try again:"
                    )),
                    Err(err) => Err(err),
                }
            }
        }
    }

    /// Drops the chat's dialogue state, e.g. when the user logs out.
    pub fn reset(&self, chat: ChatId) {
        self.sessions
            .lock()
            .expect("session lock poisoned")
            .remove(&chat);
    }

    fn state(&self, chat: ChatId) -> SessionState {
        self.sessions
            .lock()
            .expect("session lock poisoned")
            .get(&chat)
            .cloned()
            .unwrap_or(SessionState::Menu)
    }

    fn set_state(&self, chat: ChatId, state: SessionState) {
        self.sessions
            .lock()
            .expect("session lock poisoned")
            .insert(chat, state);
    }
}

fn time_format_hint(interval: &str) -> Option<&'static str> {
    match interval {
        "day" => Some("hh:mm"),
        "hour" => Some(":mm"),
        "minute" => Some(":ss"),
        _ => None,
    }
}
