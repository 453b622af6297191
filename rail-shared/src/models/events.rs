use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct TrainCreatedEvent {
    pub train_id: u64,
    pub name: String,
    pub capacity: u32,
    pub timestamp: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct TicketBookedEvent {
    pub booking_id: u64,
    pub passenger: String,
    pub train_id: u64,
    pub seat_number: u32,
    pub timestamp: i64,
}

/// Notification envelope published after a committed state change
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LedgerEvent {
    TrainCreated(TrainCreatedEvent),
    TicketBooked(TicketBookedEvent),
}

impl LedgerEvent {
    /// Topic the event is routed to on the message bus
    pub fn topic(&self) -> &'static str {
        match self {
            LedgerEvent::TrainCreated(_) => "train.created",
            LedgerEvent::TicketBooked(_) => "ticket.booked",
        }
    }

    /// Partition key. Events are published in commit order, so one train's
    /// events stay ordered within its partition.
    pub fn key(&self) -> String {
        match self {
            LedgerEvent::TrainCreated(e) => e.train_id.to_string(),
            LedgerEvent::TicketBooked(e) => e.train_id.to_string(),
        }
    }

    pub fn train_id(&self) -> u64 {
        match self {
            LedgerEvent::TrainCreated(e) => e.train_id,
            LedgerEvent::TicketBooked(e) => e.train_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_wire_format() {
        let event = LedgerEvent::TicketBooked(TicketBookedEvent {
            booking_id: 1,
            passenger: "alice".to_string(),
            train_id: 7,
            seat_number: 3,
            timestamp: 0,
        });

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "TICKET_BOOKED");
        assert_eq!(json["seat_number"], 3);
        assert_eq!(event.topic(), "ticket.booked");
        assert_eq!(event.key(), "7");
    }
}
