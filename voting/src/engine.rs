//! The voting engine — lifecycle controller and concurrent facade.
//!
//! Orchestrates the registry, delegation resolver, ballot boxes, tally
//! engine, and audit log across a proposal's life. Shared by many
//! concurrent callers: all mutations of one proposal serialize on that
//! proposal's own mutex, while operations on different proposals proceed
//! independently (the proposal map's lock is only ever held long enough to
//! look up or insert a cell, never across proposal work).
//!
//! Deadlines are enforced lazily: any access to an expired-but-Open
//! proposal first performs the close-and-tally transition, then services
//! the request. There is no background timer.

use plenum_store::{ParticipantStore, ProposalStore, StateStore};
use plenum_types::{Clock, ParticipantId, ProposalId, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use tracing::{debug, info};

use crate::audit::{AuditEvent, AuditLog};
use crate::ballot::{validate_choice, Ballot, BallotBox, Choice};
use crate::delegation;
use crate::error::VotingError;
use crate::proposal::{Proposal, ProposalState, TieBreakPolicy, VotingMethod};
use crate::registry::{Participant, ParticipantRegistry};
use crate::result::ProposalResult;
use crate::tally::{self, TallyResolution, TieDecision, SCORE_EPSILON};

/// Engine-wide tuning knobs.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Maximum delegation chain length before a participant's weight is
    /// excluded from a tally.
    pub max_delegation_depth: usize,
    /// Total credits a voter may spend on one quadratic ballot.
    pub quadratic_credit_budget: u64,
    /// Voting window of a runoff proposal spawned by the `Revote` policy.
    pub runoff_duration_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_delegation_depth: 10,
            quadratic_credit_budget: 100,
            runoff_duration_secs: 24 * 60 * 60,
        }
    }
}

/// Everything the engine tracks for one proposal. Persisted as a unit.
#[derive(Clone, Debug, Serialize, Deserialize)]
struct ProposalCell {
    proposal: Proposal,
    ballots: BallotBox,
    result: Option<ProposalResult>,
}

/// The shared, concurrent voting engine.
pub struct VotingEngine {
    registry: RwLock<ParticipantRegistry>,
    proposals: RwLock<HashMap<ProposalId, Arc<Mutex<ProposalCell>>>>,
    audit: AuditLog,
    store: Arc<dyn StateStore>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
}

impl VotingEngine {
    /// A fresh engine writing through to `store`.
    pub fn new<S>(store: Arc<S>, clock: Arc<dyn Clock>, config: EngineConfig) -> Self
    where
        S: StateStore + 'static,
    {
        Self {
            registry: RwLock::new(ParticipantRegistry::new()),
            proposals: RwLock::new(HashMap::new()),
            audit: AuditLog::with_store(store.clone()),
            store,
            clock,
            config,
        }
    }

    /// Rebuild an engine from a store's persisted state.
    pub fn restore<S>(
        store: Arc<S>,
        clock: Arc<dyn Clock>,
        config: EngineConfig,
    ) -> Result<Self, VotingError>
    where
        S: StateStore + 'static,
    {
        let mut participants = Vec::new();
        for bytes in store.list_participants()? {
            let participant: Participant = decode(&bytes)?;
            participants.push(participant);
        }

        let mut proposals = HashMap::new();
        for bytes in store.list_proposals()? {
            let cell: ProposalCell = decode(&bytes)?;
            proposals.insert(cell.proposal.id.clone(), Arc::new(Mutex::new(cell)));
        }

        let audit = AuditLog::restore(store.clone())?;

        Ok(Self {
            registry: RwLock::new(ParticipantRegistry::from_participants(participants)),
            proposals: RwLock::new(proposals),
            audit,
            store,
            clock,
            config,
        })
    }

    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    // ── Registry operations ──────────────────────────────────────────────

    /// Register a participant (or re-weight an existing one).
    ///
    /// The store write happens under the registry lock, so concurrent
    /// mutations of one participant reach the store in the order they were
    /// applied in memory. Same discipline in every registry mutator.
    pub fn register(&self, id: ParticipantId, weight: f64) -> Result<(), VotingError> {
        {
            let mut registry = self.registry.write().expect("registry poisoned");
            let participant = registry.register(id.clone(), weight)?.clone();
            self.persist_participant(&participant)?;
        }
        self.audit.append(
            self.clock.now(),
            None,
            Some(id),
            AuditEvent::ParticipantRegistered { weight },
        )?;
        Ok(())
    }

    pub fn set_weight(&self, id: &ParticipantId, weight: f64) -> Result<(), VotingError> {
        {
            let mut registry = self.registry.write().expect("registry poisoned");
            registry.set_weight(id, weight)?;
            self.persist_participant(registry.get(id)?)?;
        }
        self.audit.append(
            self.clock.now(),
            None,
            Some(id.clone()),
            AuditEvent::WeightChanged { weight },
        )?;
        Ok(())
    }

    /// Set or clear a standing delegation. Rejected if it would create a
    /// cycle.
    pub fn set_delegate(
        &self,
        id: &ParticipantId,
        delegate: Option<ParticipantId>,
    ) -> Result<(), VotingError> {
        {
            let mut registry = self.registry.write().expect("registry poisoned");
            registry.set_delegate(id, delegate.clone())?;
            self.persist_participant(registry.get(id)?)?;
        }
        self.audit.append(
            self.clock.now(),
            None,
            Some(id.clone()),
            AuditEvent::DelegateChanged { delegate },
        )?;
        Ok(())
    }

    pub fn deactivate(&self, id: &ParticipantId) -> Result<(), VotingError> {
        {
            let mut registry = self.registry.write().expect("registry poisoned");
            registry.deactivate(id)?;
            self.persist_participant(registry.get(id)?)?;
        }
        self.audit.append(
            self.clock.now(),
            None,
            Some(id.clone()),
            AuditEvent::ParticipantDeactivated,
        )?;
        Ok(())
    }

    pub fn participant(&self, id: &ParticipantId) -> Result<Participant, VotingError> {
        Ok(self.registry.read().expect("registry poisoned").get(id)?.clone())
    }

    /// All active participants.
    pub fn eligible_participants(&self) -> Vec<Participant> {
        self.registry
            .read()
            .expect("registry poisoned")
            .list_eligible()
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn total_eligible_weight(&self) -> f64 {
        self.registry
            .read()
            .expect("registry poisoned")
            .total_eligible_weight()
    }

    // ── Proposal lifecycle ───────────────────────────────────────────────

    /// Create a proposal in the `Draft` state.
    ///
    /// Structural validation happens here so malformed proposals are
    /// rejected before any state change; `open_proposal` re-checks the
    /// parts that depend on the registry.
    #[allow(clippy::too_many_arguments)]
    pub fn create_proposal(
        &self,
        id: ProposalId,
        title: impl Into<String>,
        options: Vec<String>,
        method: VotingMethod,
        quorum_threshold: f64,
        pass_threshold: Option<f64>,
        deadline: Option<Timestamp>,
        tie_break: TieBreakPolicy,
    ) -> Result<(), VotingError> {
        let now = self.clock.now();
        let proposal = Proposal {
            id: id.clone(),
            title: title.into(),
            options,
            method,
            quorum_threshold,
            pass_threshold: pass_threshold.unwrap_or_else(|| method.default_pass_threshold()),
            deadline,
            tie_break,
            state: ProposalState::Draft,
            created_at: now,
            opened_at: None,
            closed_at: None,
        };
        proposal.validate()?;

        let title = proposal.title.clone();
        let cell = Arc::new(Mutex::new(ProposalCell {
            proposal,
            ballots: BallotBox::new(),
            result: None,
        }));
        {
            let mut proposals = self.proposals.write().expect("proposal map poisoned");
            if proposals.contains_key(&id) {
                return Err(VotingError::DuplicateProposal(id));
            }
            proposals.insert(id.clone(), cell.clone());
        }

        self.persist_cell(&cell.lock().expect("proposal poisoned"))?;
        self.audit.append(
            now,
            Some(id.clone()),
            None,
            AuditEvent::ProposalCreated { title },
        )?;
        info!(proposal = %id, "proposal created");
        Ok(())
    }

    /// Open a draft for voting.
    pub fn open_proposal(&self, id: &ProposalId) -> Result<(), VotingError> {
        let cell = self.cell(id)?;
        let mut guard = cell.lock().expect("proposal poisoned");

        match guard.proposal.state {
            ProposalState::Draft => {}
            ProposalState::Open => {
                return Err(VotingError::WrongState {
                    id: id.clone(),
                    expected: ProposalState::Draft,
                    actual: ProposalState::Open,
                })
            }
            state => {
                return Err(VotingError::AlreadyClosed {
                    id: id.clone(),
                    state,
                })
            }
        }

        guard.proposal.validate()?;
        if let TieBreakPolicy::DesignatedTieBreaker(designee) = &guard.proposal.tie_break {
            let registry = self.registry.read().expect("registry poisoned");
            if !registry.contains(designee) {
                return Err(VotingError::InvalidProposal(format!(
                    "designated tie-breaker {designee} is not registered"
                )));
            }
        }

        let now = self.clock.now();
        guard.proposal.state = ProposalState::Open;
        guard.proposal.opened_at = Some(now);
        self.persist_cell(&guard)?;
        self.audit
            .append(now, Some(id.clone()), None, AuditEvent::ProposalOpened)?;
        info!(proposal = %id, "proposal opened for voting");
        Ok(())
    }

    /// Cast (or re-cast) a ballot.
    ///
    /// A re-vote before close supersedes the voter's prior ballot; both the
    /// supersession and the new cast are audited. A participant who has
    /// delegated may still vote directly — the direct ballot overrides the
    /// delegation for their own weight at resolution time.
    pub fn cast_ballot(
        &self,
        proposal_id: &ProposalId,
        voter: &ParticipantId,
        choice: Choice,
        reasoning: Option<String>,
    ) -> Result<(), VotingError> {
        let cell = self.cell(proposal_id)?;
        let mut guard = cell.lock().expect("proposal poisoned");
        self.expire_if_due(proposal_id, &mut guard)?;

        match guard.proposal.state {
            ProposalState::Open => {}
            ProposalState::Draft => {
                return Err(VotingError::WrongState {
                    id: proposal_id.clone(),
                    expected: ProposalState::Open,
                    actual: ProposalState::Draft,
                })
            }
            state => {
                return Err(VotingError::AlreadyClosed {
                    id: proposal_id.clone(),
                    state,
                })
            }
        }

        {
            let registry = self.registry.read().expect("registry poisoned");
            let participant = registry.get(voter)?;
            if !participant.active {
                return Err(VotingError::InactiveParticipant(voter.clone()));
            }
        }

        validate_choice(
            &guard.proposal,
            &choice,
            self.config.quadratic_credit_budget,
        )?;

        let now = self.clock.now();
        let superseded = guard.ballots.record(Ballot {
            voter: voter.clone(),
            choice: choice.clone(),
            reasoning: reasoning.clone(),
            cast_at: now,
        });

        if let Some(previous) = superseded {
            debug!(proposal = %proposal_id, voter = %voter, "ballot superseded by re-vote");
            self.audit.append(
                now,
                Some(proposal_id.clone()),
                Some(voter.clone()),
                AuditEvent::BallotSuperseded {
                    previous_cast_at: previous.cast_at,
                },
            )?;
        }
        self.audit.append(
            now,
            Some(proposal_id.clone()),
            Some(voter.clone()),
            AuditEvent::BallotCast { choice, reasoning },
        )?;
        self.persist_cell(&guard)?;
        Ok(())
    }

    /// Close an open proposal and tally it.
    ///
    /// Idempotent: closing an already-terminal proposal returns its
    /// existing state, never an error.
    pub fn close_proposal(&self, id: &ProposalId) -> Result<ProposalState, VotingError> {
        let cell = self.cell(id)?;
        let mut guard = cell.lock().expect("proposal poisoned");

        match guard.proposal.state {
            ProposalState::Open => {
                self.perform_close(id, &mut guard)?;
                Ok(ProposalState::Tallied)
            }
            ProposalState::Draft => Err(VotingError::WrongState {
                id: id.clone(),
                expected: ProposalState::Open,
                actual: ProposalState::Draft,
            }),
            terminal => Ok(terminal),
        }
    }

    /// Cancel an open proposal. Produces no result.
    pub fn cancel_proposal(&self, id: &ProposalId) -> Result<(), VotingError> {
        let cell = self.cell(id)?;
        let mut guard = cell.lock().expect("proposal poisoned");
        self.expire_if_due(id, &mut guard)?;

        match guard.proposal.state {
            ProposalState::Open => {}
            ProposalState::Draft => {
                return Err(VotingError::WrongState {
                    id: id.clone(),
                    expected: ProposalState::Open,
                    actual: ProposalState::Draft,
                })
            }
            state => {
                return Err(VotingError::AlreadyClosed {
                    id: id.clone(),
                    state,
                })
            }
        }

        let now = self.clock.now();
        guard.proposal.state = ProposalState::Cancelled;
        guard.proposal.closed_at = Some(now);
        self.persist_cell(&guard)?;
        self.audit
            .append(now, Some(id.clone()), None, AuditEvent::ProposalCancelled)?;
        info!(proposal = %id, "proposal cancelled");
        Ok(())
    }

    /// Current proposal snapshot (after lazy expiry).
    pub fn get_proposal(&self, id: &ProposalId) -> Result<Proposal, VotingError> {
        let cell = self.cell(id)?;
        let mut guard = cell.lock().expect("proposal poisoned");
        self.expire_if_due(id, &mut guard)?;
        Ok(guard.proposal.clone())
    }

    /// The immutable result, if the proposal has been tallied.
    pub fn get_result(&self, id: &ProposalId) -> Result<Option<ProposalResult>, VotingError> {
        let cell = self.cell(id)?;
        let mut guard = cell.lock().expect("proposal poisoned");
        self.expire_if_due(id, &mut guard)?;
        Ok(guard.result.clone())
    }

    /// All proposals, optionally filtered by state (after lazy expiry).
    pub fn list_proposals(&self, state: Option<ProposalState>) -> Vec<Proposal> {
        let cells: Vec<(ProposalId, Arc<Mutex<ProposalCell>>)> = {
            let proposals = self.proposals.read().expect("proposal map poisoned");
            proposals
                .iter()
                .map(|(id, cell)| (id.clone(), cell.clone()))
                .collect()
        };

        let mut out = Vec::new();
        for (id, cell) in cells {
            let mut guard = cell.lock().expect("proposal poisoned");
            // Expiry failures surface on direct access; listing skips them.
            let _ = self.expire_if_due(&id, &mut guard);
            if state.is_none_or(|s| s == guard.proposal.state) {
                out.push(guard.proposal.clone());
            }
        }
        out.sort_by(|a, b| a.id.cmp(&b.id));
        out
    }

    // ── Internals ────────────────────────────────────────────────────────

    /// Fetch a proposal's cell. The map lock is released before the
    /// caller takes the cell mutex.
    fn cell(&self, id: &ProposalId) -> Result<Arc<Mutex<ProposalCell>>, VotingError> {
        self.proposals
            .read()
            .expect("proposal map poisoned")
            .get(id)
            .cloned()
            .ok_or_else(|| VotingError::ProposalNotFound(id.clone()))
    }

    /// Lazy deadline enforcement: close an Open proposal whose deadline has
    /// passed before servicing the current request.
    fn expire_if_due(
        &self,
        id: &ProposalId,
        guard: &mut MutexGuard<'_, ProposalCell>,
    ) -> Result<(), VotingError> {
        if guard.proposal.state != ProposalState::Open {
            return Ok(());
        }
        let due = guard
            .proposal
            .deadline
            .is_some_and(|deadline| deadline.has_passed(self.clock.now()));
        if due {
            info!(proposal = %id, "deadline expired, closing lazily");
            self.perform_close(id, guard)?;
        }
        Ok(())
    }

    /// The `Open → Tallied` transition. Caller holds the cell mutex and has
    /// verified the proposal is Open; every ballot recorded before this
    /// point is included, anything after sees a terminal state.
    fn perform_close(
        &self,
        id: &ProposalId,
        guard: &mut MutexGuard<'_, ProposalCell>,
    ) -> Result<(), VotingError> {
        let now = self.clock.now();

        // Eligible weight and the delegation graph are read from the
        // registry at close time, so late registrations count.
        let (snapshot, total_eligible_weight) = {
            let registry = self.registry.read().expect("registry poisoned");
            (registry.snapshot(), registry.total_eligible_weight())
        };

        let direct_voters = guard.ballots.voters();
        let resolution = delegation::resolve(
            &snapshot,
            &direct_voters,
            self.config.max_delegation_depth,
        );

        // Quorum precedes any winner determination; equality at the
        // boundary counts as met.
        let quorum_met = resolution.participation_weight + SCORE_EPSILON
            >= guard.proposal.quorum_threshold * total_eligible_weight;

        let outcome = tally::tally(&guard.proposal, &guard.ballots, &resolution.effective_weights);

        let mut runoff_options = None;
        let winner = if !quorum_met {
            None
        } else {
            match &outcome.resolution {
                TallyResolution::Winner(label) => Some(label.clone()),
                TallyResolution::NoWinner => None,
                TallyResolution::Tied(tied) => {
                    match tally::break_tie(&guard.proposal, tied, &guard.ballots) {
                        TieDecision::Winner(label) => Some(label),
                        TieDecision::NoWinner => None,
                        TieDecision::Runoff => {
                            runoff_options = Some(tied.clone());
                            None
                        }
                    }
                }
            }
        };
        let runoff = runoff_options
            .is_some()
            .then(|| guard.proposal.id.runoff());

        let result = ProposalResult {
            proposal_id: id.clone(),
            method: guard.proposal.method,
            quorum_met,
            winner: winner.clone(),
            tally_detail: outcome.scores,
            participation_weight: resolution.participation_weight,
            total_eligible_weight,
            runoff: runoff.clone(),
            decided_at: now,
        };

        // The transition is staged on a copy and written to the store
        // first: a storage failure leaves both the live cell and the store
        // Open, with no partial effect, and the close can be retried.
        let mut tallied = ProposalCell::clone(guard);
        tallied.proposal.state = ProposalState::Tallied;
        tallied.proposal.closed_at = Some(now);
        tallied.result = Some(result);
        self.persist_cell(&tallied)?;
        **guard = tallied;

        if let Some(options) = &runoff_options {
            self.open_runoff(&guard.proposal, options, now)?;
        }

        for exclusion in &resolution.exclusions {
            self.audit.append(
                now,
                Some(id.clone()),
                Some(exclusion.participant.clone()),
                AuditEvent::DelegationExcluded {
                    exclusion: exclusion.clone(),
                },
            )?;
        }
        self.audit.append(
            now,
            Some(id.clone()),
            None,
            AuditEvent::ProposalClosed {
                state: ProposalState::Tallied,
            },
        )?;
        self.audit.append(
            now,
            Some(id.clone()),
            None,
            AuditEvent::ResultRecorded {
                quorum_met,
                winner: winner.clone(),
            },
        )?;
        if let Some(runoff_id) = &runoff {
            self.audit.append(
                now,
                Some(id.clone()),
                None,
                AuditEvent::RunoffOpened {
                    runoff: runoff_id.clone(),
                },
            )?;
        }
        info!(
            proposal = %id,
            quorum_met,
            winner = winner.as_deref().unwrap_or("none"),
            "proposal tallied"
        );
        Ok(())
    }

    /// Spawn the bounded second round for a `Revote` tie: same method and
    /// thresholds, options restricted to the tie set, `Reject` policy so a
    /// second tie terminates. The original proposal keeps its monotonic
    /// lifecycle; the runoff is a new proposal.
    fn open_runoff(
        &self,
        parent: &Proposal,
        tied: &[String],
        now: Timestamp,
    ) -> Result<ProposalId, VotingError> {
        let runoff_id = parent.id.runoff();
        let proposal = Proposal {
            id: runoff_id.clone(),
            title: format!("{} (runoff)", parent.title),
            options: tied.to_vec(),
            method: parent.method,
            quorum_threshold: parent.quorum_threshold,
            pass_threshold: parent.pass_threshold,
            deadline: Some(now.plus_secs(self.config.runoff_duration_secs)),
            tie_break: TieBreakPolicy::Reject,
            state: ProposalState::Open,
            created_at: now,
            opened_at: Some(now),
            closed_at: None,
        };

        let cell = Arc::new(Mutex::new(ProposalCell {
            proposal,
            ballots: BallotBox::new(),
            result: None,
        }));
        {
            let mut proposals = self.proposals.write().expect("proposal map poisoned");
            if proposals.contains_key(&runoff_id) {
                return Err(VotingError::DuplicateProposal(runoff_id));
            }
            proposals.insert(runoff_id.clone(), cell.clone());
        }

        self.persist_cell(&cell.lock().expect("proposal poisoned"))?;
        self.audit.append(
            now,
            Some(runoff_id.clone()),
            None,
            AuditEvent::ProposalOpened,
        )?;
        info!(proposal = %runoff_id, "runoff opened for tied options");
        Ok(runoff_id)
    }

    fn persist_cell(&self, cell: &ProposalCell) -> Result<(), VotingError> {
        let bytes = encode(cell)?;
        self.store.put_proposal(&cell.proposal.id, &bytes)?;
        Ok(())
    }

    fn persist_participant(&self, participant: &Participant) -> Result<(), VotingError> {
        let bytes = encode(participant)?;
        self.store.put_participant(&participant.id, &bytes)?;
        Ok(())
    }
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, VotingError> {
    bincode::serialize(value)
        .map_err(|e| plenum_store::StoreError::Serialization(e.to_string()).into())
}

fn decode<T: for<'de> Deserialize<'de>>(bytes: &[u8]) -> Result<T, VotingError> {
    bincode::deserialize(bytes)
        .map_err(|e| plenum_store::StoreError::Serialization(e.to_string()).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use plenum_nullables::{NullClock, NullStore};

    fn engine() -> (VotingEngine, Arc<NullClock>) {
        let clock = Arc::new(NullClock::new(1_000));
        let engine = VotingEngine::new(
            Arc::new(NullStore::new()),
            clock.clone(),
            EngineConfig::default(),
        );
        (engine, clock)
    }

    fn yes_no(engine: &VotingEngine, id: &str) -> ProposalId {
        let pid = ProposalId::new(id);
        engine
            .create_proposal(
                pid.clone(),
                "Adopt the thing",
                vec!["yes".into(), "no".into()],
                VotingMethod::SimpleMajority,
                0.05,
                None,
                None,
                TieBreakPolicy::Reject,
            )
            .unwrap();
        pid
    }

    fn single(label: &str) -> Choice {
        Choice::Single(label.to_string())
    }

    #[test]
    fn full_lifecycle_produces_a_result() {
        let (engine, _) = engine();
        engine.register(ParticipantId::new("alice"), 2.0).unwrap();
        engine.register(ParticipantId::new("bob"), 1.0).unwrap();

        let pid = yes_no(&engine, "p1");
        engine.open_proposal(&pid).unwrap();
        engine
            .cast_ballot(&pid, &ParticipantId::new("alice"), single("yes"), None)
            .unwrap();
        engine
            .cast_ballot(&pid, &ParticipantId::new("bob"), single("no"), None)
            .unwrap();

        assert_eq!(engine.close_proposal(&pid).unwrap(), ProposalState::Tallied);
        let result = engine.get_result(&pid).unwrap().unwrap();
        assert!(result.quorum_met);
        assert_eq!(result.winner.as_deref(), Some("yes"));
        assert_eq!(result.tally_detail["yes"], 2.0);
        assert_eq!(result.participation_weight, 3.0);
    }

    #[test]
    fn drafts_do_not_accept_ballots() {
        let (engine, _) = engine();
        engine.register(ParticipantId::new("alice"), 1.0).unwrap();
        let pid = yes_no(&engine, "p1");

        let err = engine
            .cast_ballot(&pid, &ParticipantId::new("alice"), single("yes"), None)
            .unwrap_err();
        assert!(matches!(err, VotingError::WrongState { .. }));
    }

    #[test]
    fn opening_twice_is_an_error() {
        let (engine, _) = engine();
        let pid = yes_no(&engine, "p1");
        engine.open_proposal(&pid).unwrap();
        assert!(matches!(
            engine.open_proposal(&pid).unwrap_err(),
            VotingError::WrongState { .. }
        ));
    }

    #[test]
    fn close_is_idempotent() {
        let (engine, _) = engine();
        engine.register(ParticipantId::new("alice"), 1.0).unwrap();
        let pid = yes_no(&engine, "p1");
        engine.open_proposal(&pid).unwrap();

        assert_eq!(engine.close_proposal(&pid).unwrap(), ProposalState::Tallied);
        assert_eq!(engine.close_proposal(&pid).unwrap(), ProposalState::Tallied);
        // The second close must not rewrite the result.
        let first = engine.get_result(&pid).unwrap().unwrap();
        assert_eq!(engine.close_proposal(&pid).unwrap(), ProposalState::Tallied);
        let second = engine.get_result(&pid).unwrap().unwrap();
        assert_eq!(first.decided_at, second.decided_at);
    }

    #[test]
    fn closing_a_draft_is_an_error() {
        let (engine, _) = engine();
        let pid = yes_no(&engine, "p1");
        assert!(matches!(
            engine.close_proposal(&pid).unwrap_err(),
            VotingError::WrongState { .. }
        ));
    }

    #[test]
    fn cancelled_proposals_reject_ballots_and_have_no_result() {
        let (engine, _) = engine();
        engine.register(ParticipantId::new("alice"), 1.0).unwrap();
        let pid = yes_no(&engine, "p1");
        engine.open_proposal(&pid).unwrap();
        engine.cancel_proposal(&pid).unwrap();

        assert!(matches!(
            engine
                .cast_ballot(&pid, &ParticipantId::new("alice"), single("yes"), None)
                .unwrap_err(),
            VotingError::AlreadyClosed { .. }
        ));
        assert_eq!(
            engine.get_proposal(&pid).unwrap().state,
            ProposalState::Cancelled
        );
        assert!(engine.get_result(&pid).unwrap().is_none());
        // Closing a cancelled proposal reports its terminal state.
        assert_eq!(
            engine.close_proposal(&pid).unwrap(),
            ProposalState::Cancelled
        );
    }

    #[test]
    fn duplicate_proposal_ids_are_rejected() {
        let (engine, _) = engine();
        yes_no(&engine, "p1");
        let err = engine
            .create_proposal(
                ProposalId::new("p1"),
                "Again",
                vec!["yes".into(), "no".into()],
                VotingMethod::SimpleMajority,
                0.5,
                None,
                None,
                TieBreakPolicy::Reject,
            )
            .unwrap_err();
        assert!(matches!(err, VotingError::DuplicateProposal(_)));
    }

    #[test]
    fn unknown_and_deactivated_voters_are_rejected() {
        let (engine, _) = engine();
        engine.register(ParticipantId::new("alice"), 1.0).unwrap();
        let pid = yes_no(&engine, "p1");
        engine.open_proposal(&pid).unwrap();

        assert!(matches!(
            engine
                .cast_ballot(&pid, &ParticipantId::new("ghost"), single("yes"), None)
                .unwrap_err(),
            VotingError::ParticipantNotFound(_)
        ));

        engine.deactivate(&ParticipantId::new("alice")).unwrap();
        assert!(matches!(
            engine
                .cast_ballot(&pid, &ParticipantId::new("alice"), single("yes"), None)
                .unwrap_err(),
            VotingError::InactiveParticipant(_)
        ));
    }

    #[test]
    fn designated_tie_breaker_must_be_registered_at_open() {
        let (engine, _) = engine();
        let pid = ProposalId::new("p1");
        engine
            .create_proposal(
                pid.clone(),
                "Pick one",
                vec!["a".into(), "b".into()],
                VotingMethod::SimpleMajority,
                0.05,
                None,
                None,
                TieBreakPolicy::DesignatedTieBreaker(ParticipantId::new("chair")),
            )
            .unwrap();
        assert!(matches!(
            engine.open_proposal(&pid).unwrap_err(),
            VotingError::InvalidProposal(_)
        ));

        engine.register(ParticipantId::new("chair"), 1.0).unwrap();
        engine.open_proposal(&pid).unwrap();
    }

    #[test]
    fn list_proposals_filters_by_state() {
        let (engine, _) = engine();
        let p1 = yes_no(&engine, "p1");
        let p2 = yes_no(&engine, "p2");
        engine.open_proposal(&p2).unwrap();

        let drafts = engine.list_proposals(Some(ProposalState::Draft));
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].id, p1);
        assert_eq!(engine.list_proposals(None).len(), 2);
    }
}
