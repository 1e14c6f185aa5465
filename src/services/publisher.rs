//! Outbound messaging seam between the round controller and whatever renders
//! vote prompts (an SSE-driven frontend in this deployment).

use futures::{FutureExt, future::BoxFuture};
use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::{
    dao::models::{ChannelId, CommunityId, MessageId, RoleId},
    dto::{
        sse::{AnnouncementEvent, PromptDeleteEvent, PromptEditEvent, ServerEvent, VotePromptEvent},
        votes::TallyEntry,
    },
    state::SseHub,
};

const EVENT_VOTE_PROMPT: &str = "vote.prompt";
const EVENT_PROMPT_EDIT: &str = "vote.prompt_edit";
const EVENT_PROMPT_DELETE: &str = "vote.prompt_delete";
const EVENT_ANNOUNCEMENT: &str = "vote.announcement";

/// Interactive button UIs cap out at 25 components per message, so prompts
/// carry at most that many options each.
pub const MAX_OPTIONS_PER_PROMPT: usize = 25;

/// One prompt message to publish, carrying a chunk of the round's options.
#[derive(Clone, Debug)]
pub struct VotePrompt {
    /// Channel the prompt should appear in.
    pub channel_id: ChannelId,
    /// Role to mention in the prompt, when configured.
    pub mention_role: Option<RoleId>,
    /// Prompt body.
    pub text: String,
    /// Options rendered as toggle buttons.
    pub options: Vec<String>,
}

/// Final results announced when a round closes.
#[derive(Clone, Debug)]
pub struct Announcement {
    /// Channel the announcement should appear in.
    pub channel_id: ChannelId,
    /// Role to mention, when configured.
    pub mention_role: Option<RoleId>,
    /// Winning option.
    pub winner: String,
    /// Whether the winner was drawn at random from a tie.
    pub tie: bool,
    /// Options sharing the top tally when a tie occurred.
    pub tied: Vec<String>,
    /// Full ordered results.
    pub results: Vec<TallyEntry>,
}

impl Announcement {
    fn body(&self) -> String {
        if self.tie {
            format!(
                "Tie between {} resolved by random draw: {} wins!",
                self.tied.join(", "),
                self.winner
            )
        } else {
            format!("{} wins the vote!", self.winner)
        }
    }

    fn results_summary(&self) -> String {
        let lines: Vec<String> = self
            .results
            .iter()
            .map(|entry| format!("{}: {}", entry.option, entry.votes))
            .collect();
        format!("Voting closed. Results:\n{}", lines.join("\n"))
    }
}

/// Sink for the messages a round produces. The round controller never talks
/// to a rendering surface directly; it hands prompts and announcements to
/// this trait and records the message ids it gets back.
pub trait PromptPublisher: Send + Sync {
    /// Publish one message per prompt and return the ids assigned to them,
    /// in prompt order.
    fn publish_prompts(
        &self,
        community: CommunityId,
        prompts: Vec<VotePrompt>,
    ) -> BoxFuture<'static, Vec<MessageId>>;

    /// Replace the round's prompts with a results summary and announce the
    /// winner.
    fn retire_prompts(
        &self,
        community: CommunityId,
        message_ids: Vec<MessageId>,
        announcement: Announcement,
    ) -> BoxFuture<'static, ()>;

    /// Delete prompts belonging to a superseded round without announcing
    /// anything.
    fn discard_prompts(
        &self,
        community: CommunityId,
        message_ids: Vec<MessageId>,
    ) -> BoxFuture<'static, ()>;
}

/// Publisher that emits rendering requests over the public SSE hub and mints
/// message ids locally.
pub struct SsePublisher {
    hub: SseHub,
}

impl SsePublisher {
    /// Wrap the hub prompt events should be broadcast on.
    pub fn new(hub: SseHub) -> Self {
        Self { hub }
    }

    fn send(&self, event: &str, payload: &impl Serialize) {
        match ServerEvent::json(Some(event.to_string()), payload) {
            Ok(event) => self.hub.broadcast(event),
            Err(err) => warn!(event, error = %err, "failed to serialize SSE payload"),
        }
    }
}

impl PromptPublisher for SsePublisher {
    fn publish_prompts(
        &self,
        community: CommunityId,
        prompts: Vec<VotePrompt>,
    ) -> BoxFuture<'static, Vec<MessageId>> {
        let mut ids = Vec::with_capacity(prompts.len());
        for prompt in prompts {
            let message_id = Uuid::new_v4();
            self.send(
                EVENT_VOTE_PROMPT,
                &VotePromptEvent {
                    community_id: community,
                    channel_id: prompt.channel_id,
                    message_id,
                    mention_role: prompt.mention_role,
                    text: prompt.text,
                    options: prompt.options,
                },
            );
            ids.push(message_id);
        }
        async move { ids }.boxed()
    }

    fn retire_prompts(
        &self,
        community: CommunityId,
        message_ids: Vec<MessageId>,
        announcement: Announcement,
    ) -> BoxFuture<'static, ()> {
        // The first prompt becomes the results summary, the rest disappear.
        let mut ids = message_ids.into_iter();
        if let Some(message_id) = ids.next() {
            self.send(
                EVENT_PROMPT_EDIT,
                &PromptEditEvent {
                    community_id: community,
                    message_id,
                    text: announcement.results_summary(),
                },
            );
        }
        for message_id in ids {
            self.send(
                EVENT_PROMPT_DELETE,
                &PromptDeleteEvent {
                    community_id: community,
                    message_id,
                },
            );
        }
        self.send(
            EVENT_ANNOUNCEMENT,
            &AnnouncementEvent {
                community_id: community,
                channel_id: announcement.channel_id,
                mention_role: announcement.mention_role,
                text: announcement.body(),
                winner: announcement.winner,
                tie: announcement.tie,
                tied: announcement.tied,
                results: announcement.results,
            },
        );
        async {}.boxed()
    }

    fn discard_prompts(
        &self,
        community: CommunityId,
        message_ids: Vec<MessageId>,
    ) -> BoxFuture<'static, ()> {
        for message_id in message_ids {
            self.send(
                EVENT_PROMPT_DELETE,
                &PromptDeleteEvent {
                    community_id: community,
                    message_id,
                },
            );
        }
        async {}.boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event_names(receiver: &mut tokio::sync::broadcast::Receiver<ServerEvent>) -> Vec<String> {
        let mut names = Vec::new();
        while let Ok(event) = receiver.try_recv() {
            names.push(event.event.unwrap_or_default());
        }
        names
    }

    #[tokio::test]
    async fn publish_mints_one_id_per_prompt() {
        let hub = SseHub::new(16);
        let mut receiver = hub.subscribe();
        let publisher = SsePublisher::new(hub);

        let prompt = VotePrompt {
            channel_id: 1,
            mention_role: None,
            text: "vote!".into(),
            options: vec!["A".into()],
        };
        let ids = publisher
            .publish_prompts(9, vec![prompt.clone(), prompt])
            .await;
        assert_eq!(ids.len(), 2);
        assert_ne!(ids[0], ids[1]);
        assert_eq!(
            event_names(&mut receiver),
            vec![EVENT_VOTE_PROMPT, EVENT_VOTE_PROMPT]
        );
    }

    #[tokio::test]
    async fn retire_edits_the_first_prompt_and_deletes_the_rest() {
        let hub = SseHub::new(16);
        let mut receiver = hub.subscribe();
        let publisher = SsePublisher::new(hub);

        let announcement = Announcement {
            channel_id: 1,
            mention_role: None,
            winner: "A".into(),
            tie: false,
            tied: Vec::new(),
            results: vec![TallyEntry {
                option: "A".into(),
                votes: 2,
            }],
        };
        publisher
            .retire_prompts(9, vec![Uuid::new_v4(), Uuid::new_v4()], announcement)
            .await;
        assert_eq!(
            event_names(&mut receiver),
            vec![EVENT_PROMPT_EDIT, EVENT_PROMPT_DELETE, EVENT_ANNOUNCEMENT]
        );
    }

    #[test]
    fn tie_announcement_names_the_draw() {
        let announcement = Announcement {
            channel_id: 1,
            mention_role: None,
            winner: "B".into(),
            tie: true,
            tied: vec!["A".into(), "B".into()],
            results: Vec::new(),
        };
        let body = announcement.body();
        assert!(body.contains("Tie between A, B"));
        assert!(body.contains("B wins"));
    }
}
