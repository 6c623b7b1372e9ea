pub mod consumer;
pub mod dispatcher;
pub mod outbox;
pub mod producer;
pub mod types;

pub use consumer::{ConsumerConfig, EventConsumer, MessageHandler};
pub use dispatcher::EventDispatcher;
pub use outbox::{OutboxEvent, OutboxPump, OutboxRepository};
pub use producer::{EventProducer, ProducerConfig};
pub use types::{
    topics, BankSnapshotPayload, ContributionConfirmedEvent, EventEnvelope, EventType,
    LedgerEntryCreatedEvent, LedgerEntrySummary, PaymentFailedEvent, PaymentVerifiedEvent,
    RefundDisbursementRequestedEvent, RefundDisbursementSettledEvent, RefundInitiatedEvent,
    WithdrawalRequestedEvent, WithdrawalSettledEvent,
};
