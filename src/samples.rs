//! The basic samples workflow.
//!
//! Creates a uniquely named table, raises its throughput, walks one customer
//! through insert, update, point read and delete, then lowers the
//! throughput again. Progress lines go to a [`Reporter`].

use tracing::warn;

use crate::basic_operations::{delete_entity, insert_or_merge_entity, retrieve_entity};
use crate::config::{CosmosConfig, DEFAULT_DATABASE};
use crate::errors::{Result, TableError};
use crate::metrics::OperationMetrics;
use crate::model::CustomerRecord;
use crate::store::{TableStore, ThroughputStore};
use crate::table_operations::{
    create_table_if_not_exists, delete_table_if_exists, generate_table_name,
};
use crate::throughput_operations::{ThroughputLevels, with_elevated_throughput};

/// Sink for human-readable progress lines.
pub trait Reporter {
    fn line(&mut self, message: &str);
}

/// Prints progress to stdout.
#[derive(Debug, Default)]
pub struct ConsoleReporter;

impl Reporter for ConsoleReporter {
    fn line(&mut self, message: &str) {
        println!("{}", message);
    }
}

impl Reporter for Vec<String> {
    fn line(&mut self, message: &str) {
        self.push(message.to_string());
    }
}

/// Knobs of a samples run.
#[derive(Debug, Clone)]
pub struct SampleSettings {
    pub database: String,
    pub table_prefix: String,
    pub throughput: ThroughputLevels,
    /// Leave the demo table behind after the run.
    pub keep_table: bool,
}

impl Default for SampleSettings {
    fn default() -> Self {
        SampleSettings {
            database: DEFAULT_DATABASE.to_string(),
            table_prefix: "demo".to_string(),
            throughput: ThroughputLevels::default(),
            keep_table: true,
        }
    }
}

impl SampleSettings {
    pub fn from_config(config: &CosmosConfig) -> Self {
        SampleSettings {
            database: config.database.clone(),
            keep_table: config.keep_table,
            ..Default::default()
        }
    }
}

/// What a completed run did.
#[derive(Debug, Clone)]
pub struct SampleOutcome {
    pub table: String,
    /// The customer as read back before it was deleted.
    pub customer: CustomerRecord,
    /// Metrics summed over the entity operations.
    pub entity_metrics: OperationMetrics,
}

/// Run the whole samples workflow against `store`.
pub async fn run_samples<S>(
    store: &S,
    settings: &SampleSettings,
    reporter: &mut dyn Reporter,
) -> Result<SampleOutcome>
where
    S: TableStore + ThroughputStore + ?Sized,
{
    reporter.line("Azure Table Storage - Basic Samples\n");
    reporter.line("");

    let table_name = generate_table_name(&settings.table_prefix);
    let (table, _) = create_table_if_not_exists(store, &table_name).await?;
    if table.created {
        reporter.line(&format!("Created Table named: {}", table.name));
    } else {
        reporter.line(&format!("Table {} already exists", table.name));
    }
    reporter.line("");

    let table_ref = table.name.as_str();
    let result = with_elevated_throughput(
        store,
        &settings.database,
        table_ref,
        settings.throughput,
        move || basic_data_operations(store, table_ref, reporter),
    )
    .await;

    if !settings.keep_table {
        match (delete_table_if_exists(store, &table.name).await, &result) {
            (Ok(_), _) => {}
            (Err(e), Ok(_)) => return Err(e),
            (Err(e), Err(_)) => warn!(table = %table.name, error = %e, "failed to delete demo table"),
        }
    }

    let (customer, entity_metrics) = result?;
    Ok(SampleOutcome {
        table: table.name,
        customer,
        entity_metrics,
    })
}

/// Insert, update, read and delete one customer.
///
/// Returns the customer as read back by the point query.
pub async fn basic_data_operations<S>(
    store: &S,
    table: &str,
    reporter: &mut dyn Reporter,
) -> Result<(CustomerRecord, OperationMetrics)>
where
    S: TableStore + ?Sized,
{
    let mut totals = OperationMetrics::default();
    let customer = CustomerRecord::new("Harp", "Walter")
        .with_email("Walter@contoso.com")
        .with_phone_number("425-555-0101");

    reporter.line("Insert an Entity.");
    let (mut customer, metrics) = insert_or_merge_entity(store, table, &customer).await?;
    report_charge(reporter, "InsertOrMerge", &metrics);
    totals.accumulate(&metrics);

    reporter.line("Update an existing Entity using the InsertOrMerge Upsert Operation.");
    customer.phone_number = Some("425-555-0105".to_string());
    let (_, metrics) = insert_or_merge_entity(store, table, &customer).await?;
    report_charge(reporter, "InsertOrMerge", &metrics);
    totals.accumulate(&metrics);
    reporter.line("");

    reporter.line("Reading the updated Entity.");
    let (found, metrics) =
        retrieve_entity::<_, CustomerRecord>(store, table, "Harp", "Walter").await?;
    let customer = found.ok_or_else(|| {
        TableError::ResourceNotFound(format!(
            "Entity (Harp, Walter) not found in table '{}'",
            table
        ))
    })?;
    reporter.line(&format!(
        "\t{}\t{}\t{}\t{}",
        customer.last_name,
        customer.first_name,
        customer.email.as_deref().unwrap_or(""),
        customer.phone_number.as_deref().unwrap_or("")
    ));
    report_charge(reporter, "Retrieve", &metrics);
    totals.accumulate(&metrics);
    reporter.line("");

    reporter.line("Delete the entity. ");
    let metrics = delete_entity(store, table, &customer).await?;
    report_charge(reporter, "Delete", &metrics);
    totals.accumulate(&metrics);
    reporter.line("");

    Ok((customer, totals))
}

fn report_charge(reporter: &mut dyn Reporter, operation: &str, metrics: &OperationMetrics) {
    if let Some(charge) = metrics.request_charge {
        reporter.line(&format!("Request Charge of {} Operation: {}", operation, charge));
    }
}
