mod read;
mod write;

const POST_COLUMNS: &str = "id, title, text, author_id, pub_date, category_id, location_id, \
    is_published, created_at";
