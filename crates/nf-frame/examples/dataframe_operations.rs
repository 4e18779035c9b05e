use nf_frame::{DataFrame, FrameError};
use nf_types::ColumnType;

fn main() -> Result<(), FrameError> {
    let mut frame = DataFrame::from_values(
        vec![
            ("Col1".to_owned(), vec![1.0, 2.0, 3.0]),
            ("Col2".to_owned(), vec![4.0, 5.0, 6.0]),
        ],
        Some(vec!["Row1".to_owned(), "Row2".to_owned(), "Row3".to_owned()]),
        Some(vec![ColumnType::Int, ColumnType::Double]),
    )?;
    println!("{frame}");

    frame.add_column("Col3", &[7.5, 8.5, 9.5], ColumnType::Float)?;
    frame.add_row(&[10.0, 11.0, 12.0], Some("Row4"))?;
    println!("after adding Col3 and Row4:\n{frame}");

    frame.set("Row2", "Col1", 42.0)?;
    println!("Row2 = {:?}", frame.get_row("Row2")?);
    println!("Col3 = {}", frame.column("Col3")?);

    let corner = frame.slice(["Row1", "Row4"], ["Col3", "Col1"])?;
    println!("corner slice:\n{corner}");

    let other = DataFrame::from_dict([
        ("Col1", vec![0.0, 0.0, 0.0, 0.0]),
        ("Extra", vec![1.0, 1.0, 1.0, 1.0]),
    ])?;
    frame.concatenate(&other, false)?;
    println!("concatenated columns: {:?}", frame.col_names());

    frame.drop_column("Col1_2")?;
    frame.drop_row(0_usize)?;
    println!("final {:?}:\n{frame}", frame.dim());
    Ok(())
}
