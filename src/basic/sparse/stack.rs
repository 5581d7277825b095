//! Block stacking of CSC matrices.

use nalgebra_sparse::CscMatrix;

/// Concatenates matrices left-to-right. All inputs must share a row count.
pub(crate) fn csc_hstack<T: Clone>(mats: &[&CscMatrix<T>]) -> CscMatrix<T> {
    let nrows = mats[0].nrows();
    let mut ncols = 0;
    let mut nnz = 0;
    for m in mats {
        assert_eq!(m.nrows(), nrows, "hstack inputs must share the row count");
        ncols += m.ncols();
        nnz += m.nnz();
    }

    let mut offsets: Vec<usize> = Vec::with_capacity(ncols + 1);
    let mut indices: Vec<usize> = Vec::with_capacity(nnz);
    let mut values: Vec<T> = Vec::with_capacity(nnz);
    let mut shift = 0;
    for m in mats {
        offsets.extend(m.col_offsets()[..m.ncols()].iter().map(|o| o + shift));
        indices.extend_from_slice(m.row_indices());
        values.extend_from_slice(m.values());
        shift += m.nnz();
    }
    offsets.push(nnz);

    unsafe {
        CscMatrix::try_from_csc_data(nrows, ncols, offsets, indices, values).unwrap_unchecked()
    }
}

/// Concatenates matrices top-to-bottom. All inputs must share a column count.
pub(crate) fn csc_vstack<T: Clone>(mats: &[&CscMatrix<T>]) -> CscMatrix<T> {
    let ncols = mats[0].ncols();
    let mut nrows = 0;
    let mut nnz = 0;
    for m in mats {
        assert_eq!(m.ncols(), ncols, "vstack inputs must share the column count");
        nrows += m.nrows();
        nnz += m.nnz();
    }

    let mut offsets: Vec<usize> = vec![0; ncols + 1];
    let mut indices: Vec<usize> = Vec::with_capacity(nnz);
    let mut values: Vec<T> = Vec::with_capacity(nnz);
    for col in 0..ncols {
        let mut count = 0;
        let mut shift = 0;
        for m in mats {
            let (start, end) = (m.col_offsets()[col], m.col_offsets()[col + 1]);
            indices.extend(m.row_indices()[start..end].iter().map(|r| r + shift));
            values.extend_from_slice(&m.values()[start..end]);
            shift += m.nrows();
            count += end - start;
        }
        offsets[col + 1] = offsets[col] + count;
    }

    unsafe {
        CscMatrix::try_from_csc_data(nrows, ncols, offsets, indices, values).unwrap_unchecked()
    }
}
