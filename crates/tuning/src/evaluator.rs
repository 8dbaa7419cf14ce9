use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{debug, warn};

use ragtune_agent::{Agent, IndexHandle};
use ragtune_core::{EvalQuestion, EvalResult, TuningConfiguration};

use crate::scoring::Scorer;

/// Runs the question set against one built index and grades every answer.
pub struct Evaluator {
    agent: Arc<Agent>,
    scorer: Arc<dyn Scorer>,
    concurrency: usize,
}

impl Evaluator {
    pub fn new(agent: Arc<Agent>, scorer: Arc<dyn Scorer>, concurrency: usize) -> Self {
        Self {
            agent,
            scorer,
            concurrency: concurrency.max(1),
        }
    }

    pub fn scorer_name(&self) -> &'static str {
        self.scorer.name()
    }

    /// One result per question, in question order. At most `concurrency`
    /// questions are in flight at once. A question that fails never aborts
    /// the others.
    pub async fn evaluate(
        &self,
        index: &IndexHandle,
        configuration: &TuningConfiguration,
        questions: &[EvalQuestion],
    ) -> Vec<EvalResult> {
        stream::iter(questions)
            .map(|question| self.evaluate_one(index, configuration, question))
            .buffered(self.concurrency)
            .collect()
            .await
    }

    async fn evaluate_one(
        &self,
        index: &IndexHandle,
        configuration: &TuningConfiguration,
        question: &EvalQuestion,
    ) -> EvalResult {
        let answer = match self
            .agent
            .answer(
                index,
                &question.question,
                &configuration.chunk,
                &configuration.retrieval,
                &configuration.prompt,
            )
            .await
        {
            Ok(answer) => answer,
            Err(e) => {
                warn!(
                    configuration = %configuration.id,
                    question = %question.id,
                    error = %e,
                    "question failed"
                );
                return EvalResult::failed(&configuration.id, &question.id, e.to_string());
            }
        };

        let latency_ms = answer.latency_ms();
        let retrieved = answer.retrieved.len();
        match self.scorer.score(question, &answer.text).await {
            Ok(score) => {
                debug!(
                    configuration = %configuration.id,
                    question = %question.id,
                    score,
                    latency_ms,
                    "question scored"
                );
                EvalResult::scored(
                    &configuration.id,
                    &question.id,
                    answer.text,
                    score.clamp(0.0, 1.0),
                    latency_ms,
                    retrieved,
                )
            }
            Err(e) => {
                warn!(
                    configuration = %configuration.id,
                    question = %question.id,
                    scorer = self.scorer.name(),
                    error = %e,
                    "answer could not be scored"
                );
                EvalResult::unscored(
                    &configuration.id,
                    &question.id,
                    answer.text,
                    latency_ms,
                    retrieved,
                    e.to_string(),
                )
            }
        }
    }
}
