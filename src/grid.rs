/// Row-major grid of `count` items, `columns` wide. The last row may be short.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Grid {
    count: usize,
    columns: usize,
}

impl Grid {
    pub(crate) fn new(count: usize, columns: usize) -> Self {
        Self {
            count,
            columns: columns.max(1),
        }
    }

    pub(crate) fn rows(&self) -> usize {
        self.count.div_ceil(self.columns)
    }

    pub(crate) fn columns(&self) -> usize {
        self.columns
    }

    pub(crate) fn row_len(&self, row: usize) -> usize {
        self.count
            .saturating_sub(row * self.columns)
            .min(self.columns)
    }

    /// (column, row) of an index.
    pub(crate) fn cell(&self, index: usize) -> (usize, usize) {
        (index % self.columns, index / self.columns)
    }

    pub(crate) fn left(&self, index: usize) -> usize {
        let index = self.clamp(index);
        if index % self.columns != 0 {
            index - 1
        } else {
            index
        }
    }

    pub(crate) fn right(&self, index: usize) -> usize {
        let index = self.clamp(index);
        let (col, row) = self.cell(index);
        if col + 1 < self.row_len(row) {
            index + 1
        } else {
            index
        }
    }

    pub(crate) fn up(&self, index: usize) -> usize {
        let index = self.clamp(index);
        if index >= self.columns {
            index - self.columns
        } else {
            index
        }
    }

    /// Moving down into a short last row lands on its last item.
    pub(crate) fn down(&self, index: usize) -> usize {
        let index = self.clamp(index);
        let (_, row) = self.cell(index);
        if row + 1 < self.rows() {
            (index + self.columns).min(self.count - 1)
        } else {
            index
        }
    }

    fn clamp(&self, index: usize) -> usize {
        index.min(self.count.saturating_sub(1))
    }
}
