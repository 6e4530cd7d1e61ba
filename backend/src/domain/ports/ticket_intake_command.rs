//! Driving port for opening repair tickets.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{
    Actor, Error, IntakeRequest, IntakeRules, InventoryItem, InventoryItemId, InventoryItemRef,
    InventoryItemStatus, ItemResolution, Ticket, TicketId, TicketStatus, Transition,
    TransitionId, WorkflowAction, authorize, plan_intake, validate_request,
};

use super::CreatedTicket;

/// Request to open a ticket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTicketRequest {
    /// User opening the ticket.
    pub actor: Actor,
    /// Intake payload.
    pub intake: IntakeRequest,
}

/// Driving port for ticket intake.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TicketIntakeCommand: Send + Sync {
    /// Validate the intake and commit the ticket, its first transition, and
    /// the item status in one unit of work.
    ///
    /// # Errors
    ///
    /// Returns `forbidden` for callers outside the intake roles,
    /// `invalid_request` for checklist, SRT, or unknown-serial failures,
    /// `not_found` for unknown item ids and `conflict` when the item already
    /// has an active ticket.
    async fn create_ticket(&self, request: CreateTicketRequest) -> Result<CreatedTicket, Error>;
}

/// Fixture implementation for handler tests.
///
/// Validates the request like the real service and returns ticket `1` without
/// persisting anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureTicketIntakeCommand;

#[async_trait]
impl TicketIntakeCommand for FixtureTicketIntakeCommand {
    async fn create_ticket(&self, request: CreateTicketRequest) -> Result<CreatedTicket, Error> {
        authorize(&request.actor, WorkflowAction::CreateTicket).into_result()?;
        let validated = validate_request(&request.intake, IntakeRules::default())?;
        let now = DateTime::<Utc>::UNIX_EPOCH;
        let (item_id, serial_number) = match &request.intake.item {
            InventoryItemRef::Id(id) => (*id, format!("SN-{id}")),
            InventoryItemRef::Serial(serial) => (InventoryItemId::new(1), serial.clone()),
        };
        let item = InventoryItem {
            id: item_id,
            name: serial_number.clone(),
            serial_number,
            status: InventoryItemStatus::InService,
            created_at: now,
            updated_at: now,
        };
        let plan = plan_intake(
            validated,
            ItemResolution::Existing(item.clone()),
            &request.actor,
            now,
        );
        let ticket_id = TicketId::new(1);
        Ok(CreatedTicket {
            ticket: Ticket {
                id: ticket_id,
                inventory_item_id: item.id,
                status: TicketStatus::New,
                assigned_technician_id: None,
                title: plan.title,
                checklist: plan.checklist,
                srt: plan.srt,
                created_by: plan.created_by,
                created_at: now,
                updated_at: now,
            },
            item,
            transition: Transition {
                id: TransitionId::new(1),
                ticket_id,
                from_status: None,
                to_status: TicketStatus::New,
                actor_id: plan.created_by,
                reason: None,
                created_at: now,
            },
            item_created: false,
        })
    }
}
