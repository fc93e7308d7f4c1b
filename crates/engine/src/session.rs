// Path: crates/engine/src/session.rs

//! The session state machine.
//!
//! One session corresponds to one upstream connection. It walks
//! `Connecting → AwaitingSchema → AwaitingStatus → Streaming → Closed`,
//! applying each block result to completion between two transport reads. The
//! supervisor owns the session future; when it resolves, the connection and
//! the view's uncommitted window are gone with it.

use crate::deltas::Materializer;
use crate::error::FillError;
use crate::status;
use statefill_storage::{KvStore, WriteView};
use statefill_types::codec::from_bytes_canonical;
use statefill_types::config::FillConfig;
use statefill_types::error::{ChainError, WireError};
use statefill_types::wire::{
    BlocksResult, GetBlocksRequest, UpstreamReply, UpstreamRequest, DEFAULT_MAX_MESSAGES_IN_FLIGHT,
    END_BLOCK_UNBOUNDED,
};
use statefill_types::{BlockId, FillStatus};
use statefill_upstream::{SchemaRegistry, Transport};
use std::sync::Arc;

/// Steady-state commit cadence: every this many blocks.
pub const COMMIT_EVERY_BLOCKS: u32 = 200;

/// The near-head window: once `head + NEAR_HEAD_WINDOW` reaches the
/// upstream's finality watermark, every block commits and is followed by a
/// non-blocking flush.
pub const NEAR_HEAD_WINDOW: u32 = 4;

/// Where the session currently is in the upstream protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Transport handed over, nothing received yet.
    Connecting,
    /// Waiting for the schema announcement frame.
    AwaitingSchema,
    /// Schema loaded; waiting for the status reply.
    AwaitingStatus,
    /// Block results are flowing.
    Streaming,
    /// The session has terminated.
    Closed,
}

/// One upstream connection's worth of fill progress.
pub struct Session {
    config: FillConfig,
    transport: Box<dyn Transport>,
    view: WriteView,
    registry: Option<SchemaRegistry>,
    state: SessionState,
    head: u32,
    head_id: BlockId,
    irreversible: u32,
    irreversible_id: BlockId,
    first: u32,
}

impl Session {
    /// Builds a session over an established transport. The store handle is
    /// injected; the session creates its own view over it.
    pub fn new(config: FillConfig, transport: Box<dyn Transport>, store: Arc<dyn KvStore>) -> Self {
        Self {
            config,
            transport,
            view: WriteView::new(store),
            registry: None,
            state: SessionState::Connecting,
            head: 0,
            head_id: BlockId::default(),
            irreversible: 0,
            irreversible_id: BlockId::default(),
            first: 0,
        }
    }

    /// Runs the session to completion.
    ///
    /// `Ok(())` is a clean stop (`stop_before` reached). Errors carry their
    /// retry classification; any pending, uncommitted view window is dropped
    /// with the session, so a partially-applied block is never committed.
    pub async fn run(mut self) -> Result<(), FillError> {
        let outcome = self.drive().await;
        self.transport.close().await;
        self.set_state(SessionState::Closed);
        outcome
    }

    fn set_state(&mut self, next: SessionState) {
        tracing::debug!(target: "fill", from = ?self.state, to = ?next, "session state");
        self.state = next;
    }

    async fn drive(&mut self) -> Result<(), FillError> {
        self.set_state(SessionState::AwaitingSchema);
        let frame = self.transport.recv().await?;
        let registry = SchemaRegistry::from_announcement(&frame, self.config.trx_filters.clone())?;
        tracing::info!(target: "fill", tables = registry.table_count(), "received schema");
        self.registry = Some(registry);

        self.load_fill_status()?;

        // Normalize whatever a prior run left behind: one commit of the
        // current (possibly zero) status, flushed durably.
        tracing::info!(target: "fill", head = self.head, first = self.first, "clean up stale records");
        self.commit()?;
        self.view.flush(true)?;

        self.set_state(SessionState::AwaitingStatus);
        tracing::info!(target: "fill", "request status");
        self.transport.send(&UpstreamRequest::GetStatus).await?;
        let upstream = match self.recv_reply().await? {
            UpstreamReply::Status(result) => result,
            UpstreamReply::Blocks(_) => {
                return Err(WireError::UnexpectedMessage { expected: "status result" }.into());
            }
        };
        tracing::info!(
            target: "fill",
            chain_id = %hex::encode(upstream.chain_id),
            head = upstream.head.num,
            irreversible = upstream.last_irreversible.num,
            "request blocks"
        );

        self.request_blocks().await?;
        self.set_state(SessionState::Streaming);

        loop {
            match self.recv_reply().await? {
                UpstreamReply::Blocks(result) => {
                    if !self.apply_block(result)? {
                        return Ok(());
                    }
                }
                UpstreamReply::Status(_) => {
                    return Err(WireError::UnexpectedMessage { expected: "blocks result" }.into());
                }
            }
        }
    }

    async fn recv_reply(&mut self) -> Result<UpstreamReply, FillError> {
        let frame = self.transport.recv().await?;
        Ok(from_bytes_canonical::<UpstreamReply>(&frame)?)
    }

    fn load_fill_status(&mut self) -> Result<(), FillError> {
        if let Some(persisted) = status::load(&self.view)? {
            self.head = persisted.head;
            self.head_id = persisted.head_id;
            self.irreversible = persisted.irreversible;
            self.irreversible_id = persisted.irreversible_id;
            self.first = persisted.first;
            tracing::info!(
                target: "fill",
                head = self.head,
                irreversible = self.irreversible,
                first = self.first,
                "resuming from fill status"
            );
        }
        Ok(())
    }

    /// Issues the block-stream request for `[max(skip_to, head + 1), ∞)`.
    ///
    /// `have_positions` is sent empty, so the upstream streams from the
    /// requested start with no prior-block continuity check of its own; a
    /// resume across a fork below `head` therefore surfaces as a
    /// `prev_block` mismatch here rather than being aligned upstream.
    async fn request_blocks(&mut self) -> Result<(), FillError> {
        let start = self.config.skip_to.max(self.head.saturating_add(1));
        let request = UpstreamRequest::GetBlocks(GetBlocksRequest {
            start_block_num: start,
            end_block_num: END_BLOCK_UNBOUNDED,
            max_messages_in_flight: DEFAULT_MAX_MESSAGES_IN_FLIGHT,
            have_positions: Vec::new(),
        });
        Ok(self.transport.send(&request).await?)
    }

    /// Applies one block result. Returns `false` when the session should
    /// close cleanly (`stop_before` reached).
    fn apply_block(&mut self, result: BlocksResult) -> Result<bool, FillError> {
        // Heartbeats carry no block.
        let Some(this_block) = result.this_block else {
            return Ok(true);
        };

        if self.config.stop_before != 0 && this_block.num >= self.config.stop_before {
            tracing::info!(target: "fill", block = this_block.num, "stop requested");
            self.commit()?;
            self.view.flush(true)?;
            return Ok(false);
        }

        if this_block.num <= self.head {
            // A fork rewind would require reverse-applying deltas we do not
            // have. Surface it to the operator instead of guessing.
            tracing::error!(target: "fill", block = this_block.num, head = self.head, "switch forks");
            return Err(ChainError::ForkBeforeHead {
                received: this_block.num,
                head: self.head,
            }
            .into());
        }

        if !self.head_id.is_zero() {
            let extends_head = result
                .prev_block
                .map(|prev| prev.id == self.head_id)
                .unwrap_or(false);
            if !extends_head {
                return Err(ChainError::MismatchedPrevBlock {
                    expected: self.head_id.to_string(),
                    got: result
                        .prev_block
                        .map(|prev| prev.id.to_string())
                        .unwrap_or_else(|| "none".to_string()),
                }
                .into());
            }
        }

        if let Some(deltas) = &result.deltas {
            let registry = self
                .registry
                .as_ref()
                .ok_or(WireError::UnexpectedMessage { expected: "schema announcement" })?;
            let mut materializer = Materializer {
                view: &mut self.view,
                registry,
                genesis: self.head == 0,
            };
            materializer.apply(this_block.num, deltas)?;
        }

        self.head = this_block.num;
        self.head_id = this_block.id;
        self.irreversible = result.last_irreversible.num;
        self.irreversible_id = result.last_irreversible.id;
        if self.first == 0 {
            self.first = self.head;
        }

        let near =
            this_block.num.saturating_add(NEAR_HEAD_WINDOW) >= result.last_irreversible.num;
        let commit_now = this_block.num % COMMIT_EVERY_BLOCKS == 0 || near;
        if commit_now {
            self.commit()?;
            if near {
                self.view.flush(false)?;
            }
        }
        Ok(true)
    }

    /// Writes the clamped fill status into the view, then commits the whole
    /// window atomically. Logged here, so per-block log volume stays bounded
    /// to commit boundaries.
    fn commit(&mut self) -> Result<(), FillError> {
        let persisted = FillStatus::clamped(
            self.head,
            self.head_id,
            self.irreversible,
            self.irreversible_id,
            self.first,
        );
        status::write(&mut self.view, &persisted);
        self.view.commit()?;
        tracing::info!(
            target: "fill",
            block = self.head,
            irreversible = persisted.irreversible,
            "block"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::FILL_STATUS_KEY;
    use async_trait::async_trait;
    use statefill_storage::MemoryStore;
    use statefill_types::codec::to_bytes_canonical;
    use statefill_types::wire::{DeltaRow, RowPayload, StatusResult, TableDelta};
    use statefill_types::BlockPosition;
    use statefill_upstream::TransportError;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    const ANNOUNCEMENT: &[u8] =
        br#"{ "version": 1, "tables": [ { "name": "contract_row", "prefix": "01" } ] }"#;

    /// A transport that replays scripted frames and records what the session
    /// sends. When the script runs out it reports the connection closed.
    struct ScriptedTransport {
        frames: VecDeque<Vec<u8>>,
        sent: Arc<Mutex<Vec<UpstreamRequest>>>,
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn send(&mut self, request: &UpstreamRequest) -> Result<(), TransportError> {
            self.sent.lock().unwrap().push(request.clone());
            Ok(())
        }

        async fn recv(&mut self) -> Result<Vec<u8>, TransportError> {
            self.frames.pop_front().ok_or(TransportError::Closed)
        }

        async fn close(&mut self) {}
    }

    fn block_id(num: u32) -> BlockId {
        let mut raw = [0u8; 32];
        raw[..4].copy_from_slice(&num.to_be_bytes());
        raw[31] = 0xb1;
        BlockId(raw)
    }

    fn position(num: u32) -> BlockPosition {
        BlockPosition::new(num, block_id(num))
    }

    fn delta_frame(num: u32) -> Vec<u8> {
        to_bytes_canonical(&vec![TableDelta {
            name: "contract_row".to_string(),
            rows: vec![DeltaRow {
                present: true,
                payload: to_bytes_canonical(&RowPayload {
                    key: format!("row{num:08}").into_bytes(),
                    value: num.to_le_bytes().to_vec(),
                }),
            }],
        }])
    }

    fn status_frame(head: u32, lib: u32) -> Vec<u8> {
        to_bytes_canonical(&UpstreamReply::Status(StatusResult {
            head: position(head),
            last_irreversible: position(lib),
            chain_id: [0xc4; 32],
        }))
    }

    fn block_frame(num: u32, lib: u32) -> Vec<u8> {
        to_bytes_canonical(&UpstreamReply::Blocks(BlocksResult {
            this_block: Some(position(num)),
            prev_block: (num > 1).then(|| position(num - 1)),
            last_irreversible: position(lib),
            deltas: Some(delta_frame(num)),
        }))
    }

    struct Harness {
        store: Arc<MemoryStore>,
        sent: Arc<Mutex<Vec<UpstreamRequest>>>,
        session: Session,
    }

    fn harness(config: FillConfig, frames: Vec<Vec<u8>>) -> Harness {
        harness_over(config, frames, Arc::new(MemoryStore::new()))
    }

    fn harness_over(config: FillConfig, frames: Vec<Vec<u8>>, store: Arc<MemoryStore>) -> Harness {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let transport = ScriptedTransport {
            frames: frames.into(),
            sent: Arc::clone(&sent),
        };
        let session = Session::new(
            config,
            Box::new(transport),
            Arc::clone(&store) as Arc<dyn KvStore>,
        );
        Harness { store, sent, session }
    }

    fn config() -> FillConfig {
        FillConfig {
            connect_to: "127.0.0.1:8080".to_string(),
            skip_to: 0,
            stop_before: 0,
            trx_filters: vec![],
        }
    }

    fn persisted_status(store: &Arc<MemoryStore>) -> FillStatus {
        let bytes = store
            .get(FILL_STATUS_KEY)
            .unwrap()
            .expect("fill status persisted");
        from_bytes_canonical(&bytes).expect("fill status decodes")
    }

    fn seed_status(store: &Arc<MemoryStore>, head: u32, irreversible: u32, first: u32) {
        let mut view = WriteView::new(Arc::clone(store) as Arc<dyn KvStore>);
        status::write(
            &mut view,
            &FillStatus {
                head,
                head_id: block_id(head),
                irreversible,
                irreversible_id: block_id(irreversible),
                first,
            },
        );
        view.commit().unwrap();
    }

    #[tokio::test]
    async fn fresh_bootstrap_commits_on_the_documented_cadence() {
        // Blocks 1..=1000 with the finality watermark already at 1000: the
        // periodic commits land at 200/400/600/800/1000 and the near-head
        // window adds 996..=999, nine block commits in total.
        let mut frames = vec![ANNOUNCEMENT.to_vec(), status_frame(1000, 900)];
        frames.extend((1..=1000).map(|num| block_frame(num, 1000)));

        let h = harness(config(), frames);
        let err = h.session.run().await.unwrap_err();
        assert!(err.is_transient(), "stream end retries: {err}");

        // One cleanup commit plus the nine block commits.
        assert_eq!(h.store.write_batches(), 10);

        let persisted = persisted_status(&h.store);
        assert_eq!(persisted.head, 1000);
        assert_eq!(persisted.head_id, block_id(1000));
        assert_eq!(persisted.first, 1);
        assert_eq!(persisted.irreversible, 1000);

        // The stream started from block 1.
        let sent = h.sent.lock().unwrap();
        match sent.as_slice() {
            [UpstreamRequest::GetStatus, UpstreamRequest::GetBlocks(req)] => {
                assert_eq!(req.start_block_num, 1);
                assert_eq!(req.end_block_num, END_BLOCK_UNBOUNDED);
                assert_eq!(req.max_messages_in_flight, DEFAULT_MAX_MESSAGES_IN_FLIGHT);
                assert!(req.have_positions.is_empty());
            }
            other => panic!("unexpected requests: {other:?}"),
        }

        // Every block's row was materialized.
        assert_eq!(h.store.scan(b"\x01", Some(b"\x02")).unwrap().len(), 1000);

        // Cleanup sync flush plus one non-sync flush per near-head commit.
        assert_eq!(h.store.flushes(), 6);
    }

    #[tokio::test]
    async fn catching_up_commits_every_two_hundred_blocks() {
        // The watermark is far ahead while we replay history, so the
        // near-head rule never fires.
        let mut frames = vec![ANNOUNCEMENT.to_vec(), status_frame(10_000, 9_000)];
        frames.extend((1..=450).map(|num| block_frame(num, 9_000)));

        let h = harness(config(), frames);
        let _ = h.session.run().await;

        // Cleanup plus the commits at 200 and 400.
        assert_eq!(h.store.write_batches(), 3);

        let persisted = persisted_status(&h.store);
        assert_eq!(persisted.head, 400);
        // The persisted watermark never exceeds head.
        assert_eq!(persisted.irreversible, 400);
    }

    #[tokio::test]
    async fn near_head_commits_every_block() {
        let mut frames = vec![ANNOUNCEMENT.to_vec(), status_frame(10, 8)];
        // The watermark trails by 3, inside the near-head window of 4.
        frames.extend((1..=10).map(|num| block_frame(num, num.saturating_sub(3))));

        let h = harness(config(), frames);
        let _ = h.session.run().await;

        assert_eq!(h.store.write_batches(), 11);
        let persisted = persisted_status(&h.store);
        assert_eq!(persisted.head, 10);
        assert_eq!(persisted.irreversible, 7);
    }

    #[tokio::test]
    async fn resume_requests_head_plus_one_and_accepts_a_matching_parent() {
        let store = Arc::new(MemoryStore::new());
        seed_status(&store, 500, 480, 1);

        let frames = vec![
            ANNOUNCEMENT.to_vec(),
            status_frame(520, 480),
            block_frame(501, 501),
        ];
        let h = harness_over(config(), frames, store);
        let err = h.session.run().await.unwrap_err();
        assert!(err.is_transient());

        let sent = h.sent.lock().unwrap();
        match sent.as_slice() {
            [UpstreamRequest::GetStatus, UpstreamRequest::GetBlocks(req)] => {
                assert_eq!(req.start_block_num, 501);
                assert!(req.have_positions.is_empty());
            }
            other => panic!("unexpected requests: {other:?}"),
        }

        let persisted = persisted_status(&h.store);
        assert_eq!(persisted.head, 501);
        assert_eq!(persisted.first, 1);
    }

    #[tokio::test]
    async fn skip_to_overrides_a_lower_resume_point() {
        let frames = vec![ANNOUNCEMENT.to_vec(), status_frame(1000, 900)];
        let mut cfg = config();
        cfg.skip_to = 100;

        let h = harness(cfg, frames);
        let _ = h.session.run().await;

        let sent = h.sent.lock().unwrap();
        match sent.as_slice() {
            [UpstreamRequest::GetStatus, UpstreamRequest::GetBlocks(req)] => {
                assert_eq!(req.start_block_num, 100);
            }
            other => panic!("unexpected requests: {other:?}"),
        }
    }

    #[tokio::test]
    async fn chain_discontinuity_is_fatal_and_leaves_status_untouched() {
        let store = Arc::new(MemoryStore::new());
        seed_status(&store, 500, 480, 1);

        let wrong_parent = UpstreamReply::Blocks(BlocksResult {
            this_block: Some(position(501)),
            prev_block: Some(BlockPosition::new(500, BlockId([0xee; 32]))),
            last_irreversible: position(501),
            deltas: None,
        });
        let frames = vec![
            ANNOUNCEMENT.to_vec(),
            status_frame(520, 480),
            to_bytes_canonical(&wrong_parent),
        ];

        let h = harness_over(config(), frames, store);
        let err = h.session.run().await.unwrap_err();
        assert!(!err.is_transient());
        assert!(err.to_string().contains("prev_block does not match"), "{err}");

        assert_eq!(persisted_status(&h.store).head, 500);
    }

    #[tokio::test]
    async fn a_missing_parent_is_also_a_discontinuity() {
        let store = Arc::new(MemoryStore::new());
        seed_status(&store, 500, 480, 1);

        let no_parent = UpstreamReply::Blocks(BlocksResult {
            this_block: Some(position(501)),
            prev_block: None,
            last_irreversible: position(501),
            deltas: None,
        });
        let frames = vec![
            ANNOUNCEMENT.to_vec(),
            status_frame(520, 480),
            to_bytes_canonical(&no_parent),
        ];

        let h = harness_over(config(), frames, store);
        let err = h.session.run().await.unwrap_err();
        assert!(!err.is_transient());
        assert!(err.to_string().contains("got none"), "{err}");
    }

    #[tokio::test]
    async fn a_block_at_or_below_head_requires_truncate() {
        let store = Arc::new(MemoryStore::new());
        seed_status(&store, 600, 580, 1);

        let frames = vec![
            ANNOUNCEMENT.to_vec(),
            status_frame(620, 580),
            block_frame(595, 595),
        ];
        let h = harness_over(config(), frames, store);
        let err = h.session.run().await.unwrap_err();
        assert!(!err.is_transient());
        assert!(err.to_string().contains("truncate not implemented"), "{err}");
        assert_eq!(persisted_status(&h.store).head, 600);
    }

    #[tokio::test]
    async fn stop_before_commits_flushes_and_closes_cleanly() {
        let mut frames = vec![ANNOUNCEMENT.to_vec(), status_frame(10_000, 9_000)];
        frames.extend((1..=700).map(|num| block_frame(num, 9_000)));

        let mut cfg = config();
        cfg.stop_before = 700;
        let h = harness(cfg, frames);
        h.session.run().await.expect("clean stop");

        let persisted = persisted_status(&h.store);
        assert_eq!(persisted.head, 699);
        assert_eq!(persisted.first, 1);

        // Cleanup, blocks 200/400/600, and the stop commit.
        assert_eq!(h.store.write_batches(), 5);
        // Block 700 itself was never applied.
        assert!(h
            .store
            .get(format!("\x01row{:08}", 700).as_bytes())
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn heartbeats_are_ignored() {
        let heartbeat = to_bytes_canonical(&UpstreamReply::Blocks(BlocksResult {
            this_block: None,
            prev_block: None,
            last_irreversible: position(5),
            deltas: None,
        }));
        let frames = vec![
            ANNOUNCEMENT.to_vec(),
            status_frame(10, 5),
            heartbeat,
            block_frame(1, 1),
        ];

        let h = harness(config(), frames);
        let _ = h.session.run().await;
        assert_eq!(persisted_status(&h.store).head, 1);
    }

    #[tokio::test]
    async fn a_second_status_reply_is_a_protocol_violation() {
        let frames = vec![
            ANNOUNCEMENT.to_vec(),
            status_frame(10, 5),
            status_frame(10, 5),
        ];
        let h = harness(config(), frames);
        let err = h.session.run().await.unwrap_err();
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn a_failed_commit_is_fatal_and_nothing_partial_lands() {
        let mut frames = vec![ANNOUNCEMENT.to_vec(), status_frame(10, 8)];
        frames.extend((1..=2).map(|num| block_frame(num, num)));

        let h = harness(config(), frames);
        h.store.fail_next_batch();
        let err = h.session.run().await.unwrap_err();
        assert!(!err.is_transient());

        // The failed cleanup commit ended the session before any block was
        // applied; the store is untouched.
        assert_eq!(h.store.write_batches(), 0);
        assert_eq!(h.store.get(FILL_STATUS_KEY).unwrap(), None);
        assert!(h.store.scan(b"\x01", Some(b"\x02")).unwrap().is_empty());
    }
}
