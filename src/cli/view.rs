//! View toggles shared by every subcommand that assembles a graph.

use crate::config::ViewSettings;
use crate::graph::Policy;
use clap::Args;

/// Overrides for the configured starting view
#[derive(Args, Debug, Default, Clone)]
pub struct ViewArgs {
    /// Only show tasks carrying this tag (repeatable)
    #[arg(long = "tag", value_name = "TAG")]
    pub tags: Vec<String>,

    /// Also show untagged tasks while a tag filter is active
    #[arg(long)]
    pub untagged: bool,

    /// Show completed tasks
    #[arg(long)]
    pub show_completed: bool,

    /// Hide tasks that are blocked by another task
    #[arg(long)]
    pub hide_blocked: bool,

    /// Arrange tasks into past, today and future bands by date
    #[arg(long)]
    pub dates: bool,

    /// Maximum number of tasks to scan; 0 removes the cap
    #[arg(long, value_name = "N")]
    pub limit: Option<usize>,

    /// Inclusion policy: visibility or reachability
    #[arg(long)]
    pub policy: Option<Policy>,

    /// Tag that marks tasks for the reachability policy
    #[arg(long, value_name = "TAG")]
    pub pinned_tag: Option<String>,
}

impl ViewArgs {
    /// Apply the flags on top of the configured settings. Flags only ever
    /// switch things on; an absent flag keeps the configured value.
    pub fn apply(&self, settings: &mut ViewSettings) {
        if !self.tags.is_empty() {
            settings.selected_tags = self
                .tags
                .iter()
                .map(|t| {
                    if t.starts_with('#') {
                        t.clone()
                    } else {
                        format!("#{}", t)
                    }
                })
                .collect();
        }
        settings.show_without_tags |= self.untagged;
        settings.show_completed |= self.show_completed;
        if self.hide_blocked {
            settings.show_blocked = false;
        }
        settings.use_dates |= self.dates;
        if let Some(limit) = self.limit {
            settings.task_limit = limit;
        }
        if let Some(policy) = self.policy {
            settings.policy = policy;
        }
        if let Some(ref tag) = self.pinned_tag {
            settings.pinned_tag = tag.clone();
        }
    }
}
