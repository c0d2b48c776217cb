pub(crate) mod track;
