//! Script planning: normalized script to ordered (segment, prompt) pairs.

use tracing::{info, warn};

use adgen_models::{segments_cover_script, Segment};

use crate::adapters::{PlanRequest, PlannedShot, TextPlanner};
use crate::error::{PipelineError, PipelineResult};

/// Splits a normalized script into shot-sized segments.
pub struct ScriptPlanner<'a> {
    planner: &'a dyn TextPlanner,
    target_seconds_per_clip: u32,
}

impl<'a> ScriptPlanner<'a> {
    pub fn new(planner: &'a dyn TextPlanner, target_seconds_per_clip: u32) -> Self {
        Self {
            planner,
            target_seconds_per_clip,
        }
    }

    /// Plan the script into segments.
    ///
    /// The model must return shots whose spoken text concatenates back to
    /// the script (whitespace-insensitive). A violation triggers exactly one
    /// corrective re-prompt; a second violation is a planning failure.
    pub async fn plan(
        &self,
        normalized_script: &str,
        character_name: &str,
    ) -> PipelineResult<Vec<Segment>> {
        let request = PlanRequest {
            script: normalized_script,
            character_name,
            target_seconds_per_clip: self.target_seconds_per_clip,
            corrective_note: None,
        };

        let shots = self.planner.plan(&request).await?;
        let segments = to_segments(&shots);

        if segments_cover_script(&segments, normalized_script) {
            info!("Planned {} segments", segments.len());
            return Ok(segments);
        }

        warn!("Planner output does not reproduce the script, re-prompting once");

        let corrective = PlanRequest {
            corrective_note: Some(
                "Your previous answer did not reproduce the script exactly. The \
                 concatenated segment fields must equal the script word for word, \
                 with no sentence dropped, added, or rephrased.",
            ),
            ..request
        };

        let shots = self.planner.plan(&corrective).await?;
        let segments = to_segments(&shots);

        if segments_cover_script(&segments, normalized_script) {
            info!("Planned {} segments after corrective re-prompt", segments.len());
            Ok(segments)
        } else {
            Err(PipelineError::planning(
                "Planner failed to reproduce the script after a corrective re-prompt",
            ))
        }
    }
}

fn to_segments(shots: &[PlannedShot]) -> Vec<Segment> {
    shots
        .iter()
        .enumerate()
        .map(|(i, shot)| Segment {
            index: i as u32,
            spoken_text: shot.spoken_text.clone(),
            visual_prompt: shot.visual_prompt.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Planner fake returning canned answers per call.
    struct ScriptedPlanner {
        answers: Vec<Vec<PlannedShot>>,
        calls: AtomicU32,
    }

    impl ScriptedPlanner {
        fn new(answers: Vec<Vec<PlannedShot>>) -> Self {
            Self {
                answers,
                calls: AtomicU32::new(0),
            }
        }

        fn call_count(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TextPlanner for ScriptedPlanner {
        async fn plan(&self, _request: &PlanRequest<'_>) -> PipelineResult<Vec<PlannedShot>> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) as usize;
            Ok(self.answers[n.min(self.answers.len() - 1)].clone())
        }
    }

    fn shot(text: &str) -> PlannedShot {
        PlannedShot {
            spoken_text: text.to_string(),
            visual_prompt: "wide shot, city street".to_string(),
        }
    }

    #[tokio::test]
    async fn test_valid_plan_accepted_first_try() {
        let fake = ScriptedPlanner::new(vec![vec![shot("A."), shot("B."), shot("C.")]]);
        let planner = ScriptPlanner::new(&fake, 7);

        let segments = planner.plan("A. B. C.", "character").await.unwrap();
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[1].index, 1);
        assert_eq!(fake.call_count(), 1);
    }

    #[tokio::test]
    async fn test_violation_triggers_single_reprompt() {
        let fake = ScriptedPlanner::new(vec![
            vec![shot("A.")],                        // drops two sentences
            vec![shot("A."), shot("B."), shot("C.")], // corrected
        ]);
        let planner = ScriptPlanner::new(&fake, 7);

        let segments = planner.plan("A. B. C.", "character").await.unwrap();
        assert_eq!(segments.len(), 3);
        assert_eq!(fake.call_count(), 2);
    }

    #[tokio::test]
    async fn test_second_violation_is_planning_error() {
        let fake = ScriptedPlanner::new(vec![
            vec![shot("A.")],
            vec![shot("A."), shot("B.")], // still missing C.
        ]);
        let planner = ScriptPlanner::new(&fake, 7);

        let result = planner.plan("A. B. C.", "character").await;
        assert!(matches!(result, Err(PipelineError::Planning(_))));
        assert_eq!(fake.call_count(), 2);
    }
}
