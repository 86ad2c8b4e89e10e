//! The timeline refinement sub-workflow: a bounded generate/evaluate cycle.
//!
//! Phases: `Generating -> Evaluating -> {Generating, Done}`. Evaluation
//! scores the candidate on five weighted rubric dimensions; a score at or
//! above the threshold ends the loop. The iteration bound makes the cycle
//! total: when it is exhausted, the best-scoring candidate seen wins.

use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::config::Config;
use crate::errors::AppError;
use crate::llm::{AiClient, structured::StructuredResponder};
use crate::services::prompt_templates;
use crate::services::structured_output::{
    TimelineEvaluationOutput, TimelineEvent, TimelineOutput, timeline_evaluation_schema,
    timeline_output_schema,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RefinementPhase {
    Generating,
    Evaluating,
    Done,
}

pub struct TimelineRefinery {
    responder: StructuredResponder,
    max_iterations: u32,
    score_threshold: f32,
}

impl TimelineRefinery {
    pub fn new(ai_client: Arc<dyn AiClient>, config: &Config) -> Self {
        Self {
            responder: StructuredResponder::new(ai_client, config.timeline_model.clone()),
            max_iterations: config.refinement_max_iterations.max(1),
            score_threshold: config.refinement_score_threshold,
        }
    }

    /// Runs the cycle to completion and returns the chosen timeline, sorted
    /// non-decreasing by start date ("Date unknown" entries sort last).
    #[instrument(skip(self, search_info), fields(query_len = user_query.len()))]
    pub async fn run(
        &self,
        user_query: &str,
        search_info: &str,
    ) -> Result<Vec<TimelineEvent>, AppError> {
        let mut phase = RefinementPhase::Generating;
        let mut iteration: u32 = 0;
        let mut improvements = String::new();
        let mut current: Vec<TimelineEvent> = Vec::new();
        let mut best_score = f32::MIN;
        let mut best: Vec<TimelineEvent> = Vec::new();
        let mut chosen: Vec<TimelineEvent> = Vec::new();

        loop {
            match phase {
                RefinementPhase::Generating => {
                    iteration += 1;
                    debug!(iteration, "Generating timeline candidate");
                    let prompt = prompt_templates::timeline_generation_prompt(
                        user_query,
                        search_info,
                        &improvements,
                    );
                    let output: TimelineOutput = self
                        .responder
                        .respond(&prompt, timeline_output_schema())
                        .await
                        .map_err(|e| {
                            AppError::SubWorkflowFailed(format!("timeline generation: {e}"))
                        })?;
                    current = output.events;
                    phase = RefinementPhase::Evaluating;
                }
                RefinementPhase::Evaluating => {
                    let prompt = prompt_templates::timeline_evaluation_prompt(&current);
                    let evaluation: TimelineEvaluationOutput = self
                        .responder
                        .respond(&prompt, timeline_evaluation_schema())
                        .await
                        .map_err(|e| {
                            AppError::SubWorkflowFailed(format!("timeline evaluation: {e}"))
                        })?;
                    info!(
                        iteration,
                        score = evaluation.score,
                        "Timeline candidate evaluated"
                    );

                    if evaluation.score > best_score {
                        best_score = evaluation.score;
                        best = current.clone();
                    }

                    if evaluation.score >= self.score_threshold {
                        chosen = current.clone();
                        phase = RefinementPhase::Done;
                    } else if iteration >= self.max_iterations {
                        warn!(
                            iteration,
                            best_score, "Iteration bound reached; keeping best candidate"
                        );
                        chosen = best.clone();
                        phase = RefinementPhase::Done;
                    } else {
                        improvements = evaluation.improvements;
                        phase = RefinementPhase::Generating;
                    }
                }
                RefinementPhase::Done => {
                    sort_by_start_date(&mut chosen);
                    return Ok(chosen);
                }
            }
        }
    }
}

/// Stable sort keyed on the start date; `YYYY-MM-DD` compares correctly as a
/// string, and entries without a parseable date ("Date unknown") sort after
/// dated ones.
fn sort_by_start_date(events: &mut [TimelineEvent]) {
    events.sort_by(|a, b| date_key(a).cmp(&date_key(b)));
}

fn date_key(event: &TimelineEvent) -> (bool, &str) {
    let undated = !event
        .start_date
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_digit());
    (undated, event.start_date.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(start_date: &str) -> TimelineEvent {
        TimelineEvent {
            start_date: start_date.to_string(),
            end_date: None,
            title: "t".to_string(),
            content: "c".to_string(),
        }
    }

    #[test]
    fn sorting_is_non_decreasing_by_start_date() {
        let mut events = vec![event("2009-06-01"), event("2007-08-09"), event("2008-09-15")];
        sort_by_start_date(&mut events);
        let dates: Vec<_> = events.iter().map(|e| e.start_date.as_str()).collect();
        assert_eq!(dates, vec!["2007-08-09", "2008-09-15", "2009-06-01"]);
    }

    #[test]
    fn unknown_dates_sort_after_dated_events() {
        let mut events = vec![event("Date unknown"), event("2008-09-15")];
        sort_by_start_date(&mut events);
        assert_eq!(events[0].start_date, "2008-09-15");
        assert_eq!(events[1].start_date, "Date unknown");
    }
}
