use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rail_core::{
    Booking, BookingId, Invariant, InvariantBreach, LedgerError, LedgerRepository, LedgerResult, LedgerStats, Train,
    TrainId,
};
use rail_order::{audit_records, BookingError};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::error;

/// Durable ledger store.
///
/// Each mutation is a single transaction. Bookings lock the train row before
/// any check, and ids come from a counter row locked in the same transaction,
/// so concurrent callers serialise per train and rolled-back attempts never
/// consume an id.
pub struct PostgresLedgerRepository {
    pub pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct TrainRow {
    id: i64,
    name: String,
    capacity: i64,
    available_seats: i64,
    created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: i64,
    passenger: String,
    train_id: i64,
    seat_number: i64,
    booked_at: DateTime<Utc>,
}

impl TryFrom<TrainRow> for Train {
    type Error = LedgerError;

    fn try_from(row: TrainRow) -> Result<Self, Self::Error> {
        Ok(Train {
            id: column_u64(row.id, "trains.id")?,
            name: row.name,
            capacity: column_u32(row.capacity, "trains.capacity")?,
            available_seats: column_u32(row.available_seats, "trains.available_seats")?,
            created_at: row.created_at,
        })
    }
}

impl TryFrom<BookingRow> for Booking {
    type Error = LedgerError;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        Ok(Booking {
            id: column_u64(row.id, "bookings.id")?,
            passenger: row.passenger,
            train_id: column_u64(row.train_id, "bookings.train_id")?,
            seat_number: column_u32(row.seat_number, "bookings.seat_number")?,
            booked_at: row.booked_at,
        })
    }
}

const TRAIN_COLUMNS: &str = "id, name, capacity, available_seats, created_at";
const BOOKING_COLUMNS: &str = "id, passenger, train_id, seat_number, booked_at";

impl PostgresLedgerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Take the next id from a counter, holding its row lock until commit
    async fn next_id(tx: &mut Transaction<'_, Postgres>, counter: &str) -> LedgerResult<i64> {
        let (id,): (i64,) = sqlx::query_as(
            "UPDATE ledger_counters SET next_id = next_id + 1 WHERE name = $1 RETURNING next_id - 1",
        )
        .bind(counter)
        .fetch_one(&mut **tx)
        .await
        .map_err(storage)?;

        Ok(id)
    }

    async fn load_trains(&self) -> LedgerResult<Vec<Train>> {
        let rows: Vec<TrainRow> = sqlx::query_as(&format!("SELECT {} FROM trains ORDER BY id", TRAIN_COLUMNS))
            .fetch_all(&self.pool)
            .await
            .map_err(storage)?;

        rows.into_iter().map(Train::try_from).collect()
    }

    async fn load_bookings(&self) -> LedgerResult<Vec<Booking>> {
        let rows: Vec<BookingRow> = sqlx::query_as(&format!("SELECT {} FROM bookings ORDER BY id", BOOKING_COLUMNS))
            .fetch_all(&self.pool)
            .await
            .map_err(storage)?;

        rows.into_iter().map(Booking::try_from).collect()
    }
}

#[async_trait]
impl LedgerRepository for PostgresLedgerRepository {
    async fn create_train(&self, name: &str, capacity: u32) -> LedgerResult<Train> {
        let mut tx = self.pool.begin().await.map_err(storage)?;

        let id = Self::next_id(&mut tx, "train").await?;

        let row: TrainRow = sqlx::query_as(&format!(
            "INSERT INTO trains (id, name, capacity, available_seats) VALUES ($1, $2, $3, $3) RETURNING {}",
            TRAIN_COLUMNS
        ))
        .bind(id)
        .bind(name)
        .bind(i64::from(capacity))
        .fetch_one(&mut *tx)
        .await
        .map_err(storage)?;

        tx.commit().await.map_err(storage)?;
        Train::try_from(row)
    }

    async fn book_ticket(&self, train_id: TrainId, passenger: &str) -> LedgerResult<Booking> {
        let db_train_id = i64::try_from(train_id).map_err(|_| LedgerError::train_not_found(train_id))?;

        // Dropping `tx` on any early return rolls the whole attempt back
        let mut tx = self.pool.begin().await.map_err(storage)?;

        // 1. Lock the train row; concurrent bookings on this train queue here
        let seats: Option<(i64, i64)> = sqlx::query_as(
            "SELECT capacity, available_seats FROM trains WHERE id = $1 FOR UPDATE",
        )
        .bind(db_train_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(storage)?;

        let (capacity, available) = seats.ok_or(BookingError::TrainNotFound(train_id))?;

        // 2. Capacity
        if available <= 0 {
            return Err(BookingError::NoAvailableSeats(train_id).into());
        }

        // 3. One booking per passenger per train
        let existing: Option<(i64,)> = sqlx::query_as(
            "SELECT booking_id FROM passenger_bookings WHERE passenger = $1 AND train_id = $2",
        )
        .bind(passenger)
        .bind(db_train_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(storage)?;

        if existing.is_some() {
            return Err(BookingError::DuplicateBooking {
                passenger: passenger.to_string(),
                train_id,
            }
            .into());
        }

        let seat_number = available;
        if seat_number <= 0 || seat_number > capacity {
            return Err(BookingError::InvariantViolation(format!(
                "seat {} outside 1..={} on train {}",
                seat_number, capacity, train_id
            ))
            .into());
        }

        sqlx::query("UPDATE trains SET available_seats = available_seats - 1 WHERE id = $1")
            .bind(db_train_id)
            .execute(&mut *tx)
            .await
            .map_err(storage)?;

        let booking_id = Self::next_id(&mut tx, "booking").await?;

        let row: BookingRow = sqlx::query_as(&format!(
            "INSERT INTO bookings (id, passenger, train_id, seat_number) VALUES ($1, $2, $3, $4) RETURNING {}",
            BOOKING_COLUMNS
        ))
        .bind(booking_id)
        .bind(passenger)
        .bind(db_train_id)
        .bind(seat_number)
        .fetch_one(&mut *tx)
        .await
        .map_err(storage)?;

        sqlx::query("INSERT INTO passenger_bookings (passenger, train_id, booking_id) VALUES ($1, $2, $3)")
            .bind(passenger)
            .bind(db_train_id)
            .bind(booking_id)
            .execute(&mut *tx)
            .await
            .map_err(storage)?;

        tx.commit().await.map_err(storage)?;
        Booking::try_from(row)
    }

    async fn get_train(&self, train_id: TrainId) -> LedgerResult<Train> {
        let Ok(db_id) = i64::try_from(train_id) else {
            return Err(LedgerError::train_not_found(train_id));
        };

        let row: Option<TrainRow> = sqlx::query_as(&format!("SELECT {} FROM trains WHERE id = $1", TRAIN_COLUMNS))
            .bind(db_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;

        row.ok_or_else(|| LedgerError::train_not_found(train_id))
            .and_then(Train::try_from)
    }

    async fn get_booking(&self, booking_id: BookingId) -> LedgerResult<Booking> {
        let Ok(db_id) = i64::try_from(booking_id) else {
            return Err(LedgerError::booking_not_found(booking_id));
        };

        let row: Option<BookingRow> = sqlx::query_as(&format!("SELECT {} FROM bookings WHERE id = $1", BOOKING_COLUMNS))
            .bind(db_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;

        row.ok_or_else(|| LedgerError::booking_not_found(booking_id))
            .and_then(Booking::try_from)
    }

    async fn list_trains(&self) -> LedgerResult<Vec<Train>> {
        self.load_trains().await
    }

    async fn list_passenger_bookings(&self, passenger: &str) -> LedgerResult<Vec<Booking>> {
        let rows: Vec<BookingRow> = sqlx::query_as(&format!(
            "SELECT {} FROM bookings WHERE passenger = $1 ORDER BY id",
            BOOKING_COLUMNS
        ))
        .bind(passenger)
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;

        rows.into_iter().map(Booking::try_from).collect()
    }

    async fn stats(&self) -> LedgerResult<LedgerStats> {
        let (trains, bookings): (i64, i64) = sqlx::query_as(
            "SELECT (SELECT COUNT(*) FROM trains), (SELECT COUNT(*) FROM bookings)",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(storage)?;

        Ok(LedgerStats {
            train_count: column_u64(trains, "count(trains)")?,
            booking_count: column_u64(bookings, "count(bookings)")?,
        })
    }

    async fn audit(&self) -> LedgerResult<Vec<InvariantBreach>> {
        // REPEATABLE READ so both tables come from the same snapshot
        let mut tx = self.pool.begin().await.map_err(storage)?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ READ ONLY")
            .execute(&mut *tx)
            .await
            .map_err(storage)?;

        let train_rows: Vec<TrainRow> = sqlx::query_as(&format!("SELECT {} FROM trains ORDER BY id", TRAIN_COLUMNS))
            .fetch_all(&mut *tx)
            .await
            .map_err(storage)?;
        let booking_rows: Vec<BookingRow> = sqlx::query_as(&format!("SELECT {} FROM bookings ORDER BY id", BOOKING_COLUMNS))
            .fetch_all(&mut *tx)
            .await
            .map_err(storage)?;
        let (unindexed,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM bookings b \
             LEFT JOIN passenger_bookings p ON p.booking_id = b.id \
             WHERE p.booking_id IS NULL OR p.passenger <> b.passenger OR p.train_id <> b.train_id",
        )
        .fetch_one(&mut *tx)
        .await
        .map_err(storage)?;

        tx.commit().await.map_err(storage)?;

        let trains = train_rows.into_iter().map(Train::try_from).collect::<LedgerResult<Vec<_>>>()?;
        let bookings = booking_rows.into_iter().map(Booking::try_from).collect::<LedgerResult<Vec<_>>>()?;

        let mut breaches = audit_records(&trains, &bookings);
        if unindexed > 0 {
            breaches.push(InvariantBreach::new(
                Invariant::PassengerUniqueness,
                format!("{} bookings missing from the passenger index", unindexed),
            ));
        }

        Ok(breaches)
    }
}

fn storage(err: sqlx::Error) -> LedgerError {
    error!("Database error: {}", err);
    LedgerError::Storage(err.to_string())
}

fn column_u64(value: i64, column: &str) -> LedgerResult<u64> {
    u64::try_from(value).map_err(|_| LedgerError::Storage(format!("{} holds out-of-range value {}", column, value)))
}

fn column_u32(value: i64, column: &str) -> LedgerResult<u32> {
    u32::try_from(value).map_err(|_| LedgerError::Storage(format!("{} holds out-of-range value {}", column, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::DbClient;
    use rail_core::ErrorKind;

    #[test]
    fn test_row_conversion_rejects_negative_columns() {
        let row = TrainRow {
            id: 1,
            name: "Express 101".to_string(),
            capacity: 3,
            available_seats: -1,
            created_at: Utc::now(),
        };

        let err = Train::try_from(row).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Storage);
    }

    #[test]
    fn test_row_conversion() {
        let row = BookingRow {
            id: 4,
            passenger: "alice".to_string(),
            train_id: 2,
            seat_number: 7,
            booked_at: Utc::now(),
        };

        let booking = Booking::try_from(row).unwrap();
        assert_eq!((booking.id, booking.train_id, booking.seat_number), (4, 2, 7));
    }

    /// Needs a scratch database: DATABASE_URL=postgres://... cargo test -- --ignored
    #[tokio::test]
    #[ignore]
    async fn test_postgres_reservation_walkthrough() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL not set");
        let db = DbClient::new(&url, 5).await.unwrap();
        db.migrate().await.unwrap();

        let repo = PostgresLedgerRepository::new(db.pool.clone());
        let train = repo.create_train("Express 101", 2).await.unwrap();

        let first = repo.book_ticket(train.id, "alice").await.unwrap();
        assert_eq!(first.seat_number, 2);
        assert_eq!(repo.book_ticket(train.id, "alice").await.unwrap_err().kind(), ErrorKind::AlreadyExists);

        repo.book_ticket(train.id, "bob").await.unwrap();
        assert_eq!(repo.book_ticket(train.id, "carol").await.unwrap_err().kind(), ErrorKind::ResourceExhausted);
        assert_eq!(repo.get_train(train.id).await.unwrap().available_seats, 0);
        assert!(repo.audit().await.unwrap().is_empty());
    }
}
