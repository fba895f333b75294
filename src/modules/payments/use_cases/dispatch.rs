use crate::modules::payments::adapters::outbound::payment_processor::PaymentProcessor;
use crate::modules::payments::adapters::outbound::payment_store::PaymentStore;
use crate::modules::payments::use_cases::complete_payment::command::{
    CompletePayment, CompletePaymentResult,
};
use crate::modules::payments::use_cases::complete_payment::handler::CompletePaymentHandler;
use crate::modules::payments::use_cases::create_payment::command::CreatePayment;
use crate::modules::payments::use_cases::create_payment::handler::{
    CreatePaymentHandler, CreatePaymentResult,
};
use crate::modules::payments::use_cases::errors::ApplicationError;
use crate::modules::payments::use_cases::get_payment::handler::{
    GetPayment, GetPaymentHandler, PaymentView,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentRequest {
    Create(CreatePayment),
    Complete(CompletePayment),
    Get(GetPayment),
}

impl PaymentRequest {
    pub fn name(&self) -> &'static str {
        match self {
            PaymentRequest::Create(_) => "CreatePayment",
            PaymentRequest::Complete(_) => "CompletePayment",
            PaymentRequest::Get(_) => "GetPayment",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentResponse {
    Created(CreatePaymentResult),
    Completed(CompletePaymentResult),
    Found(PaymentView),
}

/// Single entry point for every payments command and query.
pub struct PaymentsDispatcher<TStore, TProcessor>
where
    TStore: PaymentStore + 'static,
    TProcessor: PaymentProcessor + ?Sized + 'static,
{
    create: CreatePaymentHandler<TStore, TProcessor>,
    complete: CompletePaymentHandler<TStore, TProcessor>,
    get: GetPaymentHandler<TStore>,
}

impl<TStore, TProcessor> PaymentsDispatcher<TStore, TProcessor>
where
    TStore: PaymentStore + 'static,
    TProcessor: PaymentProcessor + ?Sized + 'static,
{
    pub fn new(store: Arc<TStore>, processor: Arc<TProcessor>) -> Self {
        Self {
            create: CreatePaymentHandler::new(store.clone(), processor.clone()),
            complete: CompletePaymentHandler::new(store.clone(), processor),
            get: GetPaymentHandler::new(store),
        }
    }

    pub async fn dispatch(
        &self,
        request: PaymentRequest,
    ) -> Result<PaymentResponse, ApplicationError> {
        let name = request.name();
        let started = Instant::now();
        info!(request = name, "handling {name}");

        let result = match request {
            PaymentRequest::Create(command) => {
                self.create.handle(command).await.map(PaymentResponse::Created)
            }
            PaymentRequest::Complete(command) => {
                self.complete.handle(command).await.map(PaymentResponse::Completed)
            }
            PaymentRequest::Get(query) => self.get.handle(query).await.map(PaymentResponse::Found),
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(_) => info!(request = name, elapsed_ms, "handled {name} in {elapsed_ms} ms"),
            Err(e) => error!(
                request = name,
                elapsed_ms,
                error = %e,
                "error handling {name} after {elapsed_ms} ms"
            ),
        }
        result
    }
}
