use crate::modules::payments::adapters::outbound::payment_store::{
    PaymentStore, PaymentTransaction, StoreError,
};
use crate::modules::payments::core::payment::{Payment, PaymentRecord};
use crate::shared::infrastructure::intent_outbox::in_memory::OutboxTable;
use crate::shared::infrastructure::intent_outbox::{
    OutboxEntry, OutboxError, OutboxStore, OutboxWriter,
};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Default)]
struct Tables {
    payments: HashMap<Uuid, PaymentRecord>,
    by_appointment: HashMap<Uuid, Uuid>,
    outbox: OutboxTable,
}

impl Tables {
    /// Checks the writes in order against the live rows and against each other.
    fn validate(&self, writes: &[PendingWrite]) -> Result<(), StoreError> {
        let mut appointments = HashSet::new();
        let mut versions: HashMap<Uuid, u64> = HashMap::new();
        for write in writes {
            match write {
                PendingWrite::Insert(record) => {
                    if self.by_appointment.contains_key(&record.appointment_id)
                        || !appointments.insert(record.appointment_id)
                    {
                        return Err(StoreError::DuplicateAppointment(record.appointment_id));
                    }
                    if self.payments.contains_key(&record.id) || versions.contains_key(&record.id)
                    {
                        return Err(StoreError::Backend(format!(
                            "primary key violation for payment {}",
                            record.id
                        )));
                    }
                    versions.insert(record.id, record.version + 1);
                }
                PendingWrite::Update(record) => {
                    let actual = match versions.get(&record.id) {
                        Some(version) => *version,
                        None => {
                            self.payments
                                .get(&record.id)
                                .ok_or(StoreError::NotFound(record.id))?
                                .version
                        }
                    };
                    if actual != record.version {
                        return Err(StoreError::VersionConflict {
                            expected: record.version,
                            actual,
                        });
                    }
                    versions.insert(record.id, record.version + 1);
                }
                PendingWrite::Outbox(_) => {}
            }
        }
        Ok(())
    }

    /// Only called with writes that passed `validate`.
    fn apply(&mut self, write: PendingWrite) {
        match write {
            PendingWrite::Insert(mut record) => {
                record.version += 1;
                self.by_appointment.insert(record.appointment_id, record.id);
                self.payments.insert(record.id, record);
            }
            PendingWrite::Update(mut record) => {
                record.version += 1;
                self.payments.insert(record.id, record);
            }
            PendingWrite::Outbox(entry) => self.outbox.insert(entry),
        }
    }
}

#[derive(Debug)]
enum PendingWrite {
    Insert(PaymentRecord),
    Update(PaymentRecord),
    Outbox(OutboxEntry),
}

/// In-memory payment store and outbox sharing one set of tables.
///
/// A transaction buffers its writes. Commit takes the write lock, checks the
/// appointment uniqueness constraint and row versions for the whole batch, and
/// only then applies it. Either every buffered write lands or none does.
#[derive(Clone, Default)]
pub struct InMemoryPaymentStore {
    tables: Arc<RwLock<Tables>>,
    is_offline: bool,
    fail_outbox_writes: bool,
    fail_commits: bool,
}

impl InMemoryPaymentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn toggle_offline(&mut self) {
        self.is_offline = !self.is_offline;
    }

    /// Makes `insert_outbox_entry` fail inside every new transaction.
    pub fn toggle_failing_outbox_writes(&mut self) {
        self.fail_outbox_writes = !self.fail_outbox_writes;
    }

    /// Makes `commit` fail for every new transaction.
    pub fn toggle_failing_commits(&mut self) {
        self.fail_commits = !self.fail_commits;
    }

    pub async fn payment_count(&self) -> usize {
        self.tables.read().await.payments.len()
    }

    pub async fn outbox_entries(&self) -> Vec<OutboxEntry> {
        self.tables.read().await.outbox.rows().to_vec()
    }

    fn ensure_online(&self) -> Result<(), StoreError> {
        if self.is_offline {
            return Err(StoreError::Backend("Payment store offline".into()));
        }
        Ok(())
    }

    fn ensure_outbox_online(&self) -> Result<(), OutboxError> {
        if self.is_offline {
            return Err(OutboxError::Backend("Payment store offline".into()));
        }
        Ok(())
    }
}

pub struct InMemoryPaymentTransaction {
    tables: Arc<RwLock<Tables>>,
    writes: Vec<PendingWrite>,
    fail_outbox_writes: bool,
    fail_commit: bool,
}

#[async_trait]
impl PaymentStore for InMemoryPaymentStore {
    type Tx = InMemoryPaymentTransaction;

    async fn begin(&self) -> Result<Self::Tx, StoreError> {
        self.ensure_online()?;
        Ok(InMemoryPaymentTransaction {
            tables: self.tables.clone(),
            writes: Vec::new(),
            fail_outbox_writes: self.fail_outbox_writes,
            fail_commit: self.fail_commits,
        })
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Payment>, StoreError> {
        self.ensure_online()?;
        let tables = self.tables.read().await;
        Ok(tables.payments.get(&id).cloned().map(Payment::restore))
    }

    async fn find_by_appointment_id(
        &self,
        appointment_id: Uuid,
    ) -> Result<Option<Payment>, StoreError> {
        self.ensure_online()?;
        let tables = self.tables.read().await;
        Ok(tables
            .by_appointment
            .get(&appointment_id)
            .and_then(|id| tables.payments.get(id))
            .cloned()
            .map(Payment::restore))
    }
}

#[async_trait]
impl OutboxWriter for InMemoryPaymentTransaction {
    async fn insert_outbox_entry(&mut self, entry: OutboxEntry) -> Result<(), OutboxError> {
        if self.fail_outbox_writes {
            return Err(OutboxError::Backend("outbox insert failed".into()));
        }
        self.writes.push(PendingWrite::Outbox(entry));
        Ok(())
    }
}

#[async_trait]
impl PaymentTransaction for InMemoryPaymentTransaction {
    async fn insert_payment(&mut self, payment: &Payment) -> Result<(), StoreError> {
        self.writes.push(PendingWrite::Insert(payment.to_record()));
        Ok(())
    }

    async fn update_payment(&mut self, payment: &Payment) -> Result<(), StoreError> {
        self.writes.push(PendingWrite::Update(payment.to_record()));
        Ok(())
    }

    async fn commit(self) -> Result<(), StoreError> {
        if self.fail_commit {
            return Err(StoreError::Backend("commit failed".into()));
        }
        let mut tables = self.tables.write().await;
        tables.validate(&self.writes)?;
        for write in self.writes {
            tables.apply(write);
        }
        Ok(())
    }

    async fn rollback(self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[async_trait]
impl OutboxStore for InMemoryPaymentStore {
    async fn get_unprocessed(
        &self,
        limit: usize,
        max_retries: u32,
    ) -> Result<Vec<OutboxEntry>, OutboxError> {
        self.ensure_outbox_online()?;
        Ok(self.tables.read().await.outbox.unprocessed(limit, max_retries))
    }

    async fn mark_processed(&self, id: Uuid) -> Result<(), OutboxError> {
        self.ensure_outbox_online()?;
        self.tables.write().await.outbox.mark_processed(id)
    }

    async fn increment_retry(&self, id: Uuid) -> Result<u32, OutboxError> {
        self.ensure_outbox_online()?;
        self.tables.write().await.outbox.increment_retry(id)
    }

    async fn dead_letters(
        &self,
        max_retries: u32,
        limit: usize,
    ) -> Result<Vec<OutboxEntry>, OutboxError> {
        self.ensure_outbox_online()?;
        Ok(self.tables.read().await.outbox.dead_letters(max_retries, limit))
    }

    async fn replay(&self, id: Uuid) -> Result<bool, OutboxError> {
        self.ensure_outbox_online()?;
        self.tables.write().await.outbox.replay(id)
    }
}
