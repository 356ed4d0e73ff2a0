use std::sync::Arc;

use chrono::{
    DateTime, Datelike, Duration, FixedOffset, Months, NaiveDate, NaiveTime, TimeZone, Utc,
};
use futures::future::try_join_all;
use serde::Serialize;
use tracing::debug;

use shared_database::AppointmentStore;
use shared_models::ScheduledAppointment;

use crate::context::CallContext;
use crate::models::{AppointmentError, Granularity};

/// Legacy wire format first, then ISO 8601.
const DATE_FORMATS: [&str; 2] = ["%d-%m-%Y", "%Y-%m-%d"];

/// Half-open `[start, end)` range of absolute instants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CalendarWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl CalendarWindow {
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }
}

pub struct CalendarQueryService {
    store: Arc<dyn AppointmentStore>,
    offset: FixedOffset,
}

impl CalendarQueryService {
    pub fn new(store: Arc<dyn AppointmentStore>, offset: FixedOffset) -> Self {
        Self { store, offset }
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    pub fn parse_reference_date(input: &str) -> Result<NaiveDate, AppointmentError> {
        let trimmed = input.trim();
        DATE_FORMATS
            .iter()
            .find_map(|format| NaiveDate::parse_from_str(trimmed, format).ok())
            .ok_or_else(|| {
                AppointmentError::ValidationError(format!(
                    "unparseable date '{}', expected DD-MM-YYYY or YYYY-MM-DD",
                    input
                ))
            })
    }

    /// Today's date on the calendar's clock.
    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.offset).date_naive()
    }

    fn start_of_day(&self, date: NaiveDate) -> Result<DateTime<Utc>, AppointmentError> {
        self.offset
            .from_local_datetime(&date.and_time(NaiveTime::MIN))
            .single()
            .map(|local| local.with_timezone(&Utc))
            .ok_or_else(|| AppointmentError::ValidationError(format!("date {} out of range", date)))
    }

    pub fn day_window(&self, date: NaiveDate) -> Result<CalendarWindow, AppointmentError> {
        let start = self.start_of_day(date)?;
        Ok(CalendarWindow { start, end: start + Duration::hours(24) })
    }

    /// Seven days from the reference date itself, not aligned to a calendar week.
    pub fn week_window(&self, date: NaiveDate) -> Result<CalendarWindow, AppointmentError> {
        let start = self.start_of_day(date)?;
        Ok(CalendarWindow { start, end: start + Duration::days(7) })
    }

    pub fn month_window(&self, date: NaiveDate) -> Result<CalendarWindow, AppointmentError> {
        let first = first_of_month(date)?;
        let next = add_months(first, 1)?;
        Ok(CalendarWindow {
            start: self.start_of_day(first)?,
            end: self.start_of_day(next)?,
        })
    }

    /// The twelve consecutive month windows starting at the reference month.
    pub fn year_windows(&self, date: NaiveDate) -> Result<Vec<CalendarWindow>, AppointmentError> {
        let first = first_of_month(date)?;
        (0..12)
            .map(|offset| self.month_window(add_months(first, offset)?))
            .collect()
    }

    pub async fn list_appointments(
        &self,
        date: NaiveDate,
        granularity: Granularity,
        ctx: &CallContext,
    ) -> Result<Vec<ScheduledAppointment>, AppointmentError> {
        debug!("Listing {} appointments for {}", granularity, date);

        let appointments = match granularity {
            Granularity::Day => self.fetch(self.day_window(date)?, ctx).await?,
            Granularity::Month => self.fetch(self.month_window(date)?, ctx).await?,
            Granularity::Week => self.week_appointments(date, ctx).await?,
            Granularity::Year => self.year_appointments(date, ctx).await?,
        };

        debug!("{} appointments in the {} of {}", appointments.len(), granularity, date);
        Ok(appointments)
    }

    async fn fetch(
        &self,
        window: CalendarWindow,
        ctx: &CallContext,
    ) -> Result<Vec<ScheduledAppointment>, AppointmentError> {
        Ok(ctx
            .run(self.store.find_appointments_in_range(window.start, window.end))
            .await?)
    }

    /// Served from the containing month, plus the following month when the
    /// seven days run past its end.
    async fn week_appointments(
        &self,
        date: NaiveDate,
        ctx: &CallContext,
    ) -> Result<Vec<ScheduledAppointment>, AppointmentError> {
        let week = self.week_window(date)?;
        let month = self.month_window(date)?;

        let mut appointments = self.fetch(month, ctx).await?;
        if week.end > month.end {
            let following = self.month_window(add_months(first_of_month(date)?, 1)?)?;
            appointments.extend(self.fetch(following, ctx).await?);
        }

        appointments.retain(|appointment| week.contains(appointment.start_time()));
        Ok(appointments)
    }

    async fn year_appointments(
        &self,
        date: NaiveDate,
        ctx: &CallContext,
    ) -> Result<Vec<ScheduledAppointment>, AppointmentError> {
        let months = try_join_all(
            self.year_windows(date)?
                .into_iter()
                .map(|window| self.fetch(window, ctx)),
        )
        .await?;

        Ok(months.into_iter().flatten().collect())
    }
}

fn first_of_month(date: NaiveDate) -> Result<NaiveDate, AppointmentError> {
    date.with_day(1)
        .ok_or_else(|| AppointmentError::ValidationError(format!("date {} out of range", date)))
}

fn add_months(date: NaiveDate, months: u32) -> Result<NaiveDate, AppointmentError> {
    date.checked_add_months(Months::new(months))
        .ok_or_else(|| AppointmentError::ValidationError(format!("date {} out of range", date)))
}
