//! Integration tests for loading trip files into a Parquet directory

use polars::prelude::*;
use std::fs::{self, File};
use tempfile::TempDir;
use trip_loader::{
    ColumnMapping, LoaderConfig, MemorySink, ParquetSink, Pipeline, ProcessorConfiguration,
    ValueKind, key_from_columns,
};

#[tokio::test]
async fn test_each_batch_becomes_a_part_file() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("trips.csv");
    let mut content = String::from("id,fare,pickup\n");
    for n in 0..7 {
        content.push_str(&format!("{},{}.25,2020-01-0{} 08:00:00\n", n, n, n % 5 + 1));
    }
    fs::write(&input, content).unwrap();

    let sink = ParquetSink::new(temp_dir.path().join("out"), Default::default()).unwrap();
    let mut pipeline = Pipeline::new(
        sink,
        |config| {
            config.set_batch_size(3)?;
            config.add_column("id", ValueKind::Integer)?;
            config.add_column("fare", ValueKind::Decimal)?;
            config.add_column("pickup", ValueKind::DateTime)?;
            Ok(())
        },
        key_from_columns(vec![0]),
    )
    .unwrap();

    let summary = pipeline
        .process_file(&input, &temp_dir.path().join("duplicates.csv"))
        .await
        .unwrap();
    assert_eq!(summary.sink_row_count, Some(7));

    let parts = pipeline.sink().parts().unwrap();
    assert_eq!(parts.len(), 3);

    let last = ParquetReader::new(File::open(&parts[2]).unwrap())
        .finish()
        .unwrap();
    assert_eq!(last.height(), 1);
    assert_eq!(last.column("id").unwrap().dtype(), &DataType::Int64);
    assert_eq!(last.column("fare").unwrap().dtype(), &DataType::Float64);
}

#[tokio::test]
async fn test_default_layout_writes_renamed_columns() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("trips.csv");
    fs::write(
        &input,
        "VendorID,tpep_pickup_datetime,tpep_dropoff_datetime,passenger_count,trip_distance,RatecodeID,store_and_fwd_flag,PULocationID,DOLocationID,payment_type,fare_amount,extra,mta_tax,tip_amount\n\
         1,06/01/2020 09:00:00 AM,06/01/2020 09:10:00 AM,2,1.50,1,N,100,200,1,8.00,0,0.50,2.00\n",
    )
    .unwrap();

    let config = LoaderConfig::default();
    let sink = ParquetSink::new(temp_dir.path().join("out"), config.column_names.clone()).unwrap();
    let mut pipeline = Pipeline::new(sink, |c| config.configure(c), config.duplicate_key_fn()).unwrap();
    pipeline
        .process_file(&input, &temp_dir.path().join("duplicates.csv"))
        .await
        .unwrap();

    let parts = pipeline.sink().parts().unwrap();
    let frame = ParquetReader::new(File::open(&parts[0]).unwrap())
        .finish()
        .unwrap();
    let names: Vec<String> = frame
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();
    assert_eq!(
        names,
        vec![
            "PickupDateTime",
            "DropoffDateTime",
            "PassengerCount",
            "TripDistance",
            "StoreAndFwdFlag",
            "PULocationID",
            "DOLocationID",
            "FareAmount",
            "TipAmount",
        ]
    );
    assert!(matches!(
        frame.column("PickupDateTime").unwrap().dtype(),
        DataType::Datetime(TimeUnit::Microseconds, _)
    ));
}

#[tokio::test]
async fn test_memory_and_parquet_agree_on_row_count() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("trips.csv");
    fs::write(&input, "a,b\nx,1\ny,2\nx,3\n").unwrap();

    let configure = |config: &mut ProcessorConfiguration| -> trip_loader::Result<()> {
        config.add_column_mapping(ColumnMapping::by_name("b").kind(ValueKind::Integer))?;
        Ok(())
    };

    let mut memory = Pipeline::new(MemorySink::new(), configure, key_from_columns(vec![0])).unwrap();
    let memory_summary = memory
        .process_file(&input, &temp_dir.path().join("dups-memory.csv"))
        .await
        .unwrap();

    let sink = ParquetSink::new(temp_dir.path().join("out"), Default::default()).unwrap();
    let mut parquet = Pipeline::new(sink, configure, key_from_columns(vec![0])).unwrap();
    let parquet_summary = parquet
        .process_file(&input, &temp_dir.path().join("dups-parquet.csv"))
        .await
        .unwrap();

    assert_eq!(memory_summary.sink_row_count, Some(2));
    assert_eq!(parquet_summary.sink_row_count, memory_summary.sink_row_count);
    assert_eq!(parquet.total_records().await.unwrap(), 2);
    assert_eq!(
        fs::read(temp_dir.path().join("dups-memory.csv")).unwrap(),
        fs::read(temp_dir.path().join("dups-parquet.csv")).unwrap()
    );
}
