mod advancement;
