use async_graphql::{Context, ID, Object, Result as GqlResult};
use uuid::Uuid;

use crate::modules::payments::use_cases::dispatch::{PaymentRequest, PaymentResponse};
use crate::modules::payments::use_cases::errors::ApplicationError;
use crate::modules::payments::use_cases::get_payment::handler::{GetPayment, PaymentView};
use crate::shell::state::AppState;

#[derive(async_graphql::SimpleObject, Clone)]
pub struct GqlPayment {
    pub id: ID,
    pub appointment_id: ID,
    pub payer_id: String,
    pub amount: String,
    pub currency: String,
    pub status: String,
    pub processor_reference: Option<String>,
    pub failure_reason: Option<String>,
    pub created_at: String,
    pub updated_at: Option<String>,
}

impl From<PaymentView> for GqlPayment {
    fn from(v: PaymentView) -> Self {
        Self {
            id: ID(v.id.to_string()),
            appointment_id: ID(v.appointment_id.to_string()),
            payer_id: v.payer_id,
            amount: v.amount.to_string(),
            currency: v.currency,
            status: v.status.to_string(),
            processor_reference: v.processor_reference,
            failure_reason: v.failure_reason,
            created_at: v.created_at.to_rfc3339(),
            updated_at: v.updated_at.map(|at| at.to_rfc3339()),
        }
    }
}

pub struct QueryRoot;

#[Object]
impl QueryRoot {
    async fn payment(&self, context: &Context<'_>, id: ID) -> GqlResult<Option<GqlPayment>> {
        let state = context.data_unchecked::<AppState>();
        let payment_id =
            Uuid::parse_str(&id).map_err(|e| async_graphql::Error::new(e.to_string()))?;

        match state
            .payments
            .dispatch(PaymentRequest::Get(GetPayment { payment_id }))
            .await
        {
            Ok(PaymentResponse::Found(view)) => Ok(Some(view.into())),
            Ok(other) => Err(async_graphql::Error::new(format!("unexpected response {other:?}"))),
            Err(ApplicationError::NotFound(_)) => Ok(None),
            Err(e) => Err(async_graphql::Error::new(e.to_string())),
        }
    }
}
