//! End-to-end flow: a realistic answer travels through exchange, parsing,
//! concept filtering, scoring and the cache.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::json;

use tutorkit_client::{
    ExchangeReply, ExchangeRequest, ExchangeTransport, QueryOrchestrator, TransportError,
};
use tutorkit_core::quality::QualityStatus;
use tutorkit_core::PipelineConfig;

struct CannedTransport {
    replies: Mutex<VecDeque<ExchangeReply>>,
}

#[async_trait]
impl ExchangeTransport for CannedTransport {
    async fn exchange(&self, _request: &ExchangeRequest) -> Result<ExchangeReply, TransportError> {
        Ok(self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .expect("script exhausted"))
    }
}

fn negotiation_answer() -> String {
    let lens = "When you enter a negotiation, your leverage is defined by what happens \
                if the talks collapse. Before discussing terms, map the path you would \
                take without an agreement and put a number on it. That number \
                anchors every concession you consider: offers below it are worse than \
                walking away, offers above it are gains to be traded carefully. Most \
                negotiators skip this step and bargain against their own anxiety instead \
                of against the market. Spend your preparation time improving the \
                walk-away option itself, because every improvement there moves the whole \
                negotiation in your favor without a single word spoken at the table. \
                Then decide in advance which terms matter most, so pressure in the room \
                cannot reshuffle your priorities. A clear fallback turns pressure into \
                information: if the other side pushes hard, you learn how much they need \
                the deal, while your own floor stays where the analysis put it.";
    format!(
        "**Strategic Thinking Lens**\n{lens}\n\n\
         **Story in Action**\nA supplier threatened to walk, so the buyer priced out a \
         second source before the next meeting and negotiated from that floor.\n\n\
         **Follow-up Prompts**\n\
         - What is your actual best alternative if this negotiation fails completely?\n\
         - How much would improving that alternative cost you this quarter?\n\
         - Which of your priorities would you trade away first under pressure?\n\
         - What signal would tell you the other side's alternative is weak?\n\n\
         **Concepts/Tools**\n\
         - BATNA: the best alternative to a negotiated agreement, your walk-away option\n\
         - ZOPA: the zone of possible agreement between both parties' limits\n\
         - Risk Assessment: weighing the likelihood of collapse against its cost\n\
         - Stakeholder Alignment: securing internal agreement on the walk-away point"
    )
}

#[tokio::test]
async fn answer_flows_through_the_whole_pipeline() {
    let reply = ExchangeReply::Success { data: json!({ "answer": negotiation_answer() }) };
    let warmup = ExchangeReply::Success { data: json!({ "answer": negotiation_answer() }) };
    let transport = CannedTransport { replies: Mutex::new(VecDeque::from([warmup, reply])) };
    let orchestrator = QueryOrchestrator::new(transport, PipelineConfig::default());

    let entry = orchestrator
        .query("What is my BATNA in a supplier negotiation?", "decision")
        .await
        .expect("query succeeds");

    // All four sections parsed.
    assert!(entry.parsed.has_lens());
    assert!(entry.parsed.has_narrative());
    assert_eq!(entry.parsed.follow_up_prompts.len(), 4);

    // Concepts survived the relevance filter, capped and deduplicated.
    let terms: Vec<&str> =
        entry.parsed.concepts.iter().map(|concept| concept.term.as_str()).collect();
    assert!(terms.contains(&"BATNA"));
    assert!(terms.len() <= 5);

    // A complete answer in the target bands scores at the top.
    assert_eq!(entry.quality.score, 100);
    assert_eq!(entry.quality.status, QualityStatus::High);

    // The processed entry is cached; no further exchanges are needed.
    let cached = orchestrator
        .query("What is my BATNA in a supplier negotiation?", "decision")
        .await
        .expect("cache hit");
    assert_eq!(cached.quality, entry.quality);
    let stats = orchestrator.cache_stats().await;
    assert_eq!(stats.cache.entries, 2);
    assert!(stats.is_warm);
}
